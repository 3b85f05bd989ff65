//! Store configuration.

use serde::{Deserialize, Serialize};

use crate::schema::DEFAULT_URGENCY_INDEX;

/// Buckets and table used by the fetcher and the writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Bucket holding raw ticket documents
    #[serde(default = "default_raw_bucket")]
    pub raw_bucket: String,
    /// Bucket receiving full enriched records
    #[serde(default = "default_enriched_bucket")]
    pub enriched_bucket: String,
    /// Metadata table for projections
    #[serde(default = "default_table_name")]
    pub table_name: String,
    /// Secondary index keyed by urgency
    #[serde(default = "default_urgency_index")]
    pub urgency_index: String,
}

fn default_raw_bucket() -> String {
    "tickets-raw".to_string()
}

fn default_enriched_bucket() -> String {
    "tickets-enriched".to_string()
}

fn default_table_name() -> String {
    "tickets".to_string()
}

fn default_urgency_index() -> String {
    DEFAULT_URGENCY_INDEX.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            raw_bucket: default_raw_bucket(),
            enriched_bucket: default_enriched_bucket(),
            table_name: default_table_name(),
            urgency_index: default_urgency_index(),
        }
    }
}

//! Ticket data model: raw documents, enrichment output, and stored shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::error::Error;
use crate::limits::{truncate_chars, MAX_PROJECTION_SUBJECT_CHARS, MAX_PROJECTION_SUMMARY_CHARS};

/// Default model version stamped on enrichment results.
pub const DEFAULT_MODEL_VERSION: &str = "1.0.0";

/// Urgency level, also used for the optional explicit ticket priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Critical,
    High,
    Medium,
    Low,
}

impl Urgency {
    /// All levels, most urgent first.
    pub const ALL: [Urgency; 4] = [Self::Critical, Self::High, Self::Medium, Self::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Urgency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(Error::validation(format!("unknown urgency: {}", other))),
        }
    }
}

/// Sentiment label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "POSITIVE",
            Self::Negative => "NEGATIVE",
            Self::Neutral => "NEUTRAL",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "POSITIVE" => Ok(Self::Positive),
            "NEGATIVE" => Ok(Self::Negative),
            "NEUTRAL" => Ok(Self::Neutral),
            other => Err(Error::validation(format!("unknown sentiment: {}", other))),
        }
    }
}

/// Ticket metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketMetadata {
    /// Source channel (email, web, api)
    pub source: String,
    /// Language code
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_language() -> String {
    "en".to_string()
}

impl Default for TicketMetadata {
    fn default() -> Self {
        Self {
            source: "unknown".to_string(),
            language: default_language(),
            tags: Vec::new(),
        }
    }
}

/// Raw ticket document as stored in the raw container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct RawTicket {
    #[validate(length(min = 1, max = 256))]
    pub ticket_id: String,
    pub subject: String,
    pub body: String,
    /// Explicit priority, if the submitter set one
    #[serde(default)]
    pub priority: Option<Urgency>,
    /// Unix seconds
    #[validate(range(min = 0))]
    pub created_at: i64,
    #[validate(length(min = 1, max = 256))]
    pub customer_id: String,
    #[serde(default)]
    pub metadata: TicketMetadata,
}

/// Output of the enrichment gateway for one ticket.
///
/// All fields are always present; a gateway either returns a complete
/// result or fails the call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct EnrichmentResult {
    /// Semantic embedding (fixed 384 dims)
    #[validate(length(equal = 384))]
    pub embedding: Vec<f32>,

    pub intent: String,
    #[validate(range(min = 0.0, max = 1.0))]
    pub intent_confidence: f64,

    pub urgency: Urgency,
    #[validate(range(min = 0.0, max = 1.0))]
    pub urgency_confidence: f64,

    pub sentiment: Sentiment,
    #[validate(range(min = 0.0, max = 1.0))]
    pub sentiment_confidence: f64,

    pub summary: String,

    pub processed_at: DateTime<Utc>,
    #[serde(default = "default_model_version")]
    pub model_version: String,
}

fn default_model_version() -> String {
    DEFAULT_MODEL_VERSION.to_string()
}

/// Full enriched ticket, serialized to the enriched blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub ticket_id: String,
    pub subject: String,
    pub body: String,
    pub priority: Option<Urgency>,
    pub created_at: i64,
    pub customer_id: String,
    pub metadata: TicketMetadata,
    pub enrichment: EnrichmentResult,
}

impl EnrichedRecord {
    /// Combine a raw ticket with its enrichment.
    pub fn from_raw(raw: RawTicket, enrichment: EnrichmentResult) -> Self {
        Self {
            ticket_id: raw.ticket_id,
            subject: raw.subject,
            body: raw.body,
            priority: raw.priority,
            created_at: raw.created_at,
            customer_id: raw.customer_id,
            metadata: raw.metadata,
            enrichment,
        }
    }

    /// Blob key for this record, derived only from the ticket id.
    pub fn blob_key(&self) -> String {
        blob_key(&self.ticket_id)
    }
}

/// Blob key for a ticket id.
pub fn blob_key(ticket_id: &str) -> String {
    format!("{}.json", ticket_id)
}

/// Compact projection written to the metadata table (no embedding).
///
/// Keyed by `(ticket_id, created_at)`; `s3_key` points at the full record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredProjection {
    pub ticket_id: String,
    pub created_at: i64,
    pub subject: String,
    pub customer_id: String,
    pub intent: String,
    pub urgency: Urgency,
    pub sentiment: Sentiment,
    pub summary: String,
    pub processed_at: DateTime<Utc>,
    pub s3_key: String,
}

impl StructuredProjection {
    pub fn from_enriched(record: &EnrichedRecord) -> Self {
        let e = &record.enrichment;
        Self {
            ticket_id: record.ticket_id.clone(),
            created_at: record.created_at,
            subject: truncate_chars(&record.subject, MAX_PROJECTION_SUBJECT_CHARS),
            customer_id: record.customer_id.clone(),
            intent: e.intent.clone(),
            urgency: e.urgency,
            sentiment: e.sentiment,
            summary: truncate_chars(&e.summary, MAX_PROJECTION_SUMMARY_CHARS),
            processed_at: e.processed_at,
            s3_key: record.blob_key(),
        }
    }

    /// Composite primary key.
    pub fn key(&self) -> (&str, i64) {
        (&self.ticket_id, self.created_at)
    }
}

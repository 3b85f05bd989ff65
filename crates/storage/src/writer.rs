//! Dual-store writer.
//!
//! The full record goes to the enriched bucket first, then the projection
//! goes to the metadata table. A crash between the two leaves an orphan
//! blob that the next delivery overwrites; it never leaves a projection
//! whose `s3_key` points at nothing.

use std::sync::Arc;
use std::time::Instant;
use telemetry::metrics;
use ticket_core::{EnrichedRecord, Result, StructuredProjection};
use tracing::debug;

use crate::blob::BlobStore;
use crate::table::ProjectionStore;

/// Persists enriched records to the blob store and the projection store.
#[derive(Clone)]
pub struct DualStoreWriter {
    blobs: Arc<dyn BlobStore>,
    projections: Arc<dyn ProjectionStore>,
    enriched_bucket: String,
}

impl DualStoreWriter {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        projections: Arc<dyn ProjectionStore>,
        enriched_bucket: impl Into<String>,
    ) -> Self {
        Self {
            blobs,
            projections,
            enriched_bucket: enriched_bucket.into(),
        }
    }

    pub fn enriched_bucket(&self) -> &str {
        &self.enriched_bucket
    }

    /// Writes blob then projection; either failure fails the whole write.
    ///
    /// Both keys derive from the ticket id, so repeating a write replaces
    /// the earlier output instead of adding to it.
    pub async fn write(&self, record: &EnrichedRecord) -> Result<StructuredProjection> {
        let start = Instant::now();
        let key = record.blob_key();

        let body = serde_json::to_vec_pretty(record)?;

        self.blobs
            .put_json(&self.enriched_bucket, &key, body)
            .await?;

        let projection = StructuredProjection::from_enriched(record);
        self.projections.put(&projection).await?;

        metrics()
            .store_latency_ms
            .observe(start.elapsed().as_millis() as u64);

        debug!(
            ticket_id = %record.ticket_id,
            bucket = %self.enriched_bucket,
            key = %key,
            "Stored enriched record"
        );

        Ok(projection)
    }
}

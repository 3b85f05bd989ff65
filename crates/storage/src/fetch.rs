//! Raw ticket fetcher.

use std::sync::Arc;
use ticket_core::schema::decode_raw_ticket;
use ticket_core::{ProcessingUnit, RawTicket, Result};
use tracing::debug;

use crate::blob::BlobStore;

/// Loads raw ticket documents and validates them against the schema.
#[derive(Clone)]
pub struct TicketFetcher {
    blobs: Arc<dyn BlobStore>,
}

impl TicketFetcher {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    /// Reads `unit` and decodes it into a validated [`RawTicket`].
    ///
    /// A missing object is a fetch error; a payload that does not match the
    /// ticket schema is a validation error.
    pub async fn fetch(&self, unit: &ProcessingUnit) -> Result<RawTicket> {
        let bytes = self.blobs.get(&unit.bucket, &unit.key).await?;
        let ticket = decode_raw_ticket(&bytes)?;

        debug!(ticket_id = %ticket.ticket_id, unit = %unit, "Fetched ticket");
        Ok(ticket)
    }
}

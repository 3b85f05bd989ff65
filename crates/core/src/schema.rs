//! Schema validation for raw tickets and enrichment results.

use validator::Validate;

use crate::error::{Error, Result};
use crate::limits::{EMBEDDING_DIM, MAX_RAW_TICKET_BYTES};
use crate::tickets::{EnrichmentResult, RawTicket};

/// Decode and validate a raw ticket document.
///
/// Oversized payloads, non-JSON bytes, missing or mistyped required fields
/// all fail with a validation error.
pub fn decode_raw_ticket(raw_bytes: &[u8]) -> Result<RawTicket> {
    if raw_bytes.len() > MAX_RAW_TICKET_BYTES {
        return Err(Error::validation(format!(
            "ticket {}KB exceeds {}KB limit",
            raw_bytes.len() / 1024,
            MAX_RAW_TICKET_BYTES / 1024
        )));
    }

    let ticket: RawTicket = serde_json::from_slice(raw_bytes)
        .map_err(|e| Error::validation(format!("ticket schema: {}", e)))?;

    ticket
        .validate()
        .map_err(|e| Error::validation(format!("ticket {}: {}", ticket.ticket_id, e)))?;

    Ok(ticket)
}

/// Validates a gateway result before it is stored.
pub fn validate_enrichment(result: &EnrichmentResult) -> Result<()> {
    result
        .validate()
        .map_err(|e| Error::enrichment(format!("invalid enrichment result: {}", e)))?;

    // range() lets NaN through
    let confidences = [
        result.intent_confidence,
        result.urgency_confidence,
        result.sentiment_confidence,
    ];
    if confidences.iter().any(|c| !c.is_finite()) {
        return Err(Error::enrichment("confidence is not a finite number"));
    }

    if result.embedding.len() != EMBEDDING_DIM {
        return Err(Error::enrichment(format!(
            "embedding has {} dims, expected {}",
            result.embedding.len(),
            EMBEDDING_DIM
        )));
    }
    if result.embedding.iter().any(|v| !v.is_finite()) {
        return Err(Error::enrichment("embedding contains non-finite values"));
    }

    if result.intent.is_empty() {
        return Err(Error::enrichment("intent label is empty"));
    }

    Ok(())
}

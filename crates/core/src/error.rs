//! Unified error types for the ticket enrichment worker.
//!
//! Error codes:
//! - PARSE_001: Malformed queue notification
//! - FETCH_001: Raw object missing or unreadable
//! - VALID_001: Raw ticket violates the document schema
//! - ENRICH_001: Enrichment gateway failed or returned an invalid result
//! - STORE_001: Blob or projection write failed
//! - GATEWAY_001: Enrichment gateway could not be initialized
//! - QUEUE_001: Queue receive/delete failed
//! - CONFIG_001: Invalid configuration

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the worker.
#[derive(Debug, Error)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("enrichment error: {0}")]
    Enrichment(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("gateway initialization error: {0}")]
    GatewayInit(String),

    #[error("queue error: {0}")]
    Queue(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn enrichment(msg: impl Into<String>) -> Self {
        Self::Enrichment(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn gateway_init(msg: impl Into<String>) -> Self {
        Self::GatewayInit(msg.into())
    }

    pub fn queue(msg: impl Into<String>) -> Self {
        Self::Queue(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Get the stable error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Parse(_) => "PARSE_001",
            Self::Fetch(_) => "FETCH_001",
            Self::Validation(_) | Self::Serialization(_) => "VALID_001",
            Self::Enrichment(_) => "ENRICH_001",
            Self::Storage(_) => "STORE_001",
            Self::GatewayInit(_) => "GATEWAY_001",
            Self::Queue(_) => "QUEUE_001",
            Self::Config(_) => "CONFIG_001",
        }
    }

    /// Whether this error only fails the current unit.
    ///
    /// Unit-local errors leave the owning message on the queue for
    /// redelivery; everything else is a process-level concern.
    pub fn is_unit_local(&self) -> bool {
        matches!(
            self,
            Self::Parse(_)
                | Self::Fetch(_)
                | Self::Validation(_)
                | Self::Serialization(_)
                | Self::Enrichment(_)
                | Self::Storage(_)
        )
    }
}

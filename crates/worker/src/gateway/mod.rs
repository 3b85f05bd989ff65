//! Enrichment gateways.
//!
//! A gateway turns a ticket into an [`EnrichmentResult`]: embedding, intent,
//! urgency and sentiment labels with confidences, and a summary. Labels must
//! be stable for identical input so redelivered tickets land on the same
//! projection values.

pub mod local;
pub mod remote;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use ticket_core::{EnrichmentResult, Error, RawTicket, Result, DEFAULT_MODEL_VERSION};
use tracing::info;

pub use local::LocalGateway;
pub use remote::RemoteGateway;

/// Enrichment capability consumed by the processor.
///
/// `enrich` returns a complete result or an error, never a partial result.
#[async_trait]
pub trait EnrichmentGateway: Send + Sync {
    async fn enrich(&self, ticket: &RawTicket) -> Result<EnrichmentResult>;

    fn model_version(&self) -> &str;

    async fn health_check(&self) -> Result<()>;
}

/// Which gateway implementation to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayMode {
    Local,
    Remote,
}

/// Gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_mode")]
    pub mode: GatewayMode,
    /// Base URL of the remote enrichment service
    #[serde(default)]
    pub url: Option<String>,
    /// Upper bound for a single enrichment call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Summary length cap in words
    #[serde(default = "default_max_summary_length")]
    pub max_summary_length: usize,
    #[serde(default = "default_model_version")]
    pub model_version: String,
}

fn default_mode() -> GatewayMode {
    GatewayMode::Local
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_summary_length() -> usize {
    50
}

fn default_model_version() -> String {
    DEFAULT_MODEL_VERSION.to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            url: None,
            timeout_secs: default_timeout_secs(),
            max_summary_length: default_max_summary_length(),
            model_version: default_model_version(),
        }
    }
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Builds and probes the configured gateway.
///
/// Any failure here is a [`Error::GatewayInit`]; the worker must not start
/// without a working gateway.
pub async fn build_gateway(config: &GatewayConfig) -> Result<Arc<dyn EnrichmentGateway>> {
    let gateway: Arc<dyn EnrichmentGateway> = match config.mode {
        GatewayMode::Local => Arc::new(LocalGateway::new(config)?),
        GatewayMode::Remote => Arc::new(RemoteGateway::connect(config).await?),
    };

    gateway.health_check().await.map_err(|e| match e {
        Error::GatewayInit(_) => e,
        other => Error::gateway_init(other.to_string()),
    })?;

    info!(
        mode = ?config.mode,
        model_version = gateway.model_version(),
        "Enrichment gateway ready"
    );
    Ok(gateway)
}

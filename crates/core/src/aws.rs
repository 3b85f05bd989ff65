//! Shared AWS connection settings for the queue and the stores.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};

/// Endpoint used when `use_localstack` is set without an explicit override.
pub const LOCALSTACK_ENDPOINT: &str = "http://localhost:4566";

/// AWS connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    #[serde(default = "default_region")]
    pub region: String,
    /// Endpoint override (LocalStack or a VPC endpoint)
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// Target a LocalStack instance instead of real AWS
    #[serde(default)]
    pub use_localstack: bool,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            endpoint_url: None,
            use_localstack: false,
        }
    }
}

impl AwsConfig {
    /// Effective endpoint: the override if set, else LocalStack in local mode.
    pub fn endpoint(&self) -> Option<String> {
        match (&self.endpoint_url, self.use_localstack) {
            (Some(url), _) => Some(url.clone()),
            (None, true) => Some(LOCALSTACK_ENDPOINT.to_string()),
            (None, false) => None,
        }
    }

    /// Checks the endpoint override is a usable URL.
    pub fn validate(&self) -> Result<()> {
        if self.region.trim().is_empty() {
            return Err(Error::config("AWS region must not be empty"));
        }
        if let Some(endpoint) = self.endpoint() {
            let parsed = url::Url::parse(&endpoint)
                .map_err(|e| Error::config(format!("invalid endpoint {}: {}", endpoint, e)))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(Error::config(format!(
                    "endpoint {} must be http or https",
                    endpoint
                )));
            }
        }
        Ok(())
    }
}

/// Loads the shared SDK config for all service clients.
///
/// LocalStack accepts any credentials, so static test credentials are
/// installed there unless the environment provides some.
pub async fn load_sdk_config(config: &AwsConfig) -> aws_config::SdkConfig {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(config.region.clone()));

    if let Some(endpoint) = config.endpoint() {
        loader = loader.endpoint_url(endpoint);
    }

    if config.use_localstack && std::env::var("AWS_ACCESS_KEY_ID").is_err() {
        loader = loader.credentials_provider(aws_credential_types::Credentials::new(
            "test",
            "test",
            None,
            None,
            "localstack",
        ));
    }

    let sdk_config = loader.load().await;

    info!(
        region = %config.region,
        endpoint = config.endpoint().as_deref().unwrap_or("default"),
        localstack = config.use_localstack,
        "Loaded AWS config"
    );

    sdk_config
}

//! HTTP client for a remote enrichment service.
//!
//! The service exposes `GET {url}/health` and `POST {url}/enrich`; the
//! response body of `/enrich` is an [`EnrichmentResult`].

use async_trait::async_trait;
use serde::Serialize;
use ticket_core::{EnrichmentResult, Error, RawTicket, Result, Urgency};
use tracing::{debug, info};

use super::{EnrichmentGateway, GatewayConfig};

#[derive(Debug, Serialize)]
struct EnrichRequest<'a> {
    ticket_id: &'a str,
    subject: &'a str,
    body: &'a str,
    priority: Option<Urgency>,
    max_summary_length: usize,
}

/// Gateway that delegates enrichment to a remote service.
pub struct RemoteGateway {
    client: reqwest::Client,
    base_url: String,
    max_summary_length: usize,
    model_version: String,
}

impl RemoteGateway {
    /// Builds the HTTP client. Reachability is checked by `health_check`.
    pub async fn connect(config: &GatewayConfig) -> Result<Self> {
        let url = config
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Error::gateway_init("remote gateway requires ENRICHMENT_URL"))?;

        let parsed = url
            .parse::<reqwest::Url>()
            .map_err(|e| Error::gateway_init(format!("invalid enrichment url {}: {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::gateway_init(format!(
                "enrichment url must be http or https: {}",
                url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::gateway_init(format!("http client: {}", e)))?;

        info!(url = %url, timeout_secs = config.timeout_secs, "Created remote enrichment client");

        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
            max_summary_length: config.max_summary_length,
            model_version: config.model_version.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl EnrichmentGateway for RemoteGateway {
    async fn enrich(&self, ticket: &RawTicket) -> Result<EnrichmentResult> {
        let request = EnrichRequest {
            ticket_id: &ticket.ticket_id,
            subject: &ticket.subject,
            body: &ticket.body,
            priority: ticket.priority,
            max_summary_length: self.max_summary_length,
        };

        let response = self
            .client
            .post(format!("{}/enrich", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::enrichment(format!("enrich {} failed: {}", ticket.ticket_id, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::enrichment(format!(
                "enrich {} returned {}",
                ticket.ticket_id, status
            )));
        }

        let result = response.json::<EnrichmentResult>().await.map_err(|e| {
            Error::enrichment(format!("bad enrich response for {}: {}", ticket.ticket_id, e))
        })?;

        debug!(ticket_id = %ticket.ticket_id, intent = %result.intent, "Remote enrichment done");
        Ok(result)
    }

    fn model_version(&self) -> &str {
        &self.model_version
    }

    async fn health_check(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::gateway_init(format!("{} unreachable: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(Error::gateway_init(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }
        Ok(())
    }
}

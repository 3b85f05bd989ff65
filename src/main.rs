//! Ticket Enrichment Worker
//!
//! Queue-driven pipeline handling:
//! - Storage notifications from SQS (S3 events or direct key references)
//! - Raw ticket fetch and schema validation
//! - Enrichment (embedding, intent, urgency, sentiment, summary)
//! - Dual-store persistence: full record to S3, projection to DynamoDB

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use validator::Validate;

use queue::{QueueConfig, SqsQueue};
use storage::{DualStoreWriter, DynamoProjectionStore, S3BlobStore, StorageConfig, TicketFetcher};
use telemetry::{health, init_tracing_from_env, metrics};
use ticket_core::{load_sdk_config, AwsConfig};
use worker::{build_gateway, GatewayConfig, GatewayMode, ProcessorConfig, TicketProcessor};

/// Application configuration.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default)]
    aws: AwsConfig,

    #[serde(default)]
    queue: QueueConfig,

    #[serde(default)]
    storage: StorageConfig,

    #[serde(default)]
    gateway: GatewayConfig,
}

impl Config {
    fn validate(&self) -> Result<()> {
        self.queue
            .validate()
            .context("Invalid queue configuration")?;
        self.aws.validate().context("Invalid AWS configuration")?;

        if self.queue.visibility_timeout() <= self.gateway.timeout() {
            warn!(
                visibility_timeout_secs = self.queue.visibility_timeout_secs,
                gateway_timeout_secs = self.gateway.timeout_secs,
                "Visibility timeout does not exceed the gateway timeout; slow messages may be processed twice"
            );
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting Ticket Enrichment Worker v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    config.validate()?;

    info!(
        queue = %config.queue.queue_name,
        raw_bucket = %config.storage.raw_bucket,
        enriched_bucket = %config.storage.enriched_bucket,
        table = %config.storage.table_name,
        region = %config.aws.region,
        endpoint = config.aws.endpoint().as_deref().unwrap_or("default"),
        "Loaded configuration"
    );

    // The worker must not start without a working gateway.
    let gateway = match build_gateway(&config.gateway).await {
        Ok(gateway) => {
            health().gateway.set_healthy();
            gateway
        }
        Err(e) => {
            health().gateway.set_unhealthy(e.to_string());
            error!(error = %e, code = e.code(), "Failed to initialize enrichment gateway");
            return Err(e).context("Enrichment gateway unavailable");
        }
    };

    let sdk_config = load_sdk_config(&config.aws).await;

    let sqs = SqsQueue::connect(&sdk_config, config.queue.clone())
        .await
        .context("Failed to connect to SQS queue")?;

    let blobs = S3BlobStore::new(&sdk_config, config.aws.use_localstack);
    let projections = DynamoProjectionStore::new(
        &sdk_config,
        &config.storage.table_name,
        &config.storage.urgency_index,
    );

    check_health(&config, &sqs, &blobs, &projections).await;

    let blobs = Arc::new(blobs);
    let fetcher = TicketFetcher::new(blobs.clone());
    let writer = DualStoreWriter::new(
        blobs,
        Arc::new(projections),
        &config.storage.enriched_bucket,
    );

    let mut processor = TicketProcessor::new(
        Arc::new(sqs),
        fetcher,
        gateway,
        writer,
        ProcessorConfig::from_parts(&config.queue, &config.storage, &config.gateway),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    processor
        .run(shutdown_rx)
        .await
        .context("Processor error")?;

    info!("Shutting down...");
    processor.stats().log_summary();

    let snapshot = metrics().snapshot();
    info!(
        messages_received = snapshot.messages_received,
        messages_acknowledged = snapshot.messages_acknowledged,
        messages_retained = snapshot.messages_retained,
        poison_messages = snapshot.poison_messages,
        unit_latency_mean_ms = format!("{:.1}", snapshot.unit_latency_mean_ms),
        "Final metrics"
    );

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("TICKETS")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Conventional flat names used by deployment manifests
    if let Ok(name) = std::env::var("SQS_QUEUE_NAME") {
        config.queue.queue_name = name;
    }
    if let Ok(wait) = std::env::var("SQS_POLL_INTERVAL") {
        config.queue.wait_time_secs = wait.parse().context("Invalid SQS_POLL_INTERVAL")?;
    }
    if let Ok(max) = std::env::var("SQS_MAX_MESSAGES") {
        config.queue.max_messages = max.parse().context("Invalid SQS_MAX_MESSAGES")?;
    }
    if let Ok(timeout) = std::env::var("SQS_VISIBILITY_TIMEOUT") {
        config.queue.visibility_timeout_secs =
            timeout.parse().context("Invalid SQS_VISIBILITY_TIMEOUT")?;
    }

    if let Ok(bucket) = std::env::var("S3_BUCKET_RAW") {
        config.storage.raw_bucket = bucket;
    }
    if let Ok(bucket) = std::env::var("S3_BUCKET_ENRICHED") {
        config.storage.enriched_bucket = bucket;
    }
    if let Ok(table) = std::env::var("DYNAMODB_TABLE") {
        config.storage.table_name = table;
    }

    if let Ok(len) = std::env::var("MAX_SUMMARY_LENGTH") {
        config.gateway.max_summary_length = len.parse().context("Invalid MAX_SUMMARY_LENGTH")?;
    }
    if let Ok(mode) = std::env::var("ENRICHMENT_GATEWAY") {
        config.gateway.mode = match mode.trim().to_lowercase().as_str() {
            "local" => GatewayMode::Local,
            "remote" => GatewayMode::Remote,
            other => anyhow::bail!("Invalid ENRICHMENT_GATEWAY: {}", other),
        };
    }
    if let Ok(url) = std::env::var("ENRICHMENT_URL") {
        config.gateway.url = Some(url);
    }

    if let Ok(region) = std::env::var("AWS_REGION") {
        config.aws.region = region;
    }
    if let Ok(flag) = std::env::var("USE_LOCALSTACK") {
        config.aws.use_localstack = matches!(flag.trim().to_lowercase().as_str(), "1" | "true" | "yes");
    }
    if let Ok(endpoint) = std::env::var("AWS_ENDPOINT_URL") {
        config.aws.endpoint_url = Some(endpoint);
    }

    Ok(config)
}

/// Check component health on startup. Failures are logged, not fatal.
async fn check_health(
    config: &Config,
    sqs: &SqsQueue,
    blobs: &S3BlobStore,
    projections: &DynamoProjectionStore,
) {
    let queue_ok = queue::health::check_connection(sqs).await;
    health().queue.record(queue_ok, "Queue unreachable");

    let raw_ok = storage::health::check_bucket(blobs, &config.storage.raw_bucket).await;
    health().raw_bucket.record(raw_ok, "Raw bucket unreachable");

    let enriched_ok = storage::health::check_bucket(blobs, &config.storage.enriched_bucket).await;
    health().enriched_bucket.record(enriched_ok, "Enriched bucket unreachable");

    let table_ok = storage::health::check_table(projections).await;
    health().table.record(table_ok, "Table unreachable");

    let report = health().report();
    if health().is_ready() {
        info!(status = ?report.status, "Startup health checks complete");
    } else {
        warn!(status = ?report.status, "Startup health checks found unhealthy components");
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}

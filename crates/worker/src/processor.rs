//! Queue-driven ticket processor.
//!
//! One loop, one message at a time:
//! 1. Long-poll a batch from the queue (back off when empty)
//! 2. Parse each message into processing units
//! 3. For each unit: fetch → enrich → write blob → write projection
//! 4. Delete the message only when every unit succeeded
//!
//! A failed unit stops the rest of its message and leaves the message for
//! redelivery. Writes are keyed by ticket id, so redelivery overwrites
//! rather than duplicates (at-least-once).

use std::sync::Arc;
use std::time::{Duration, Instant};

use queue::{MessageQueue, QueueConfig, QueueMessage};
use storage::{DualStoreWriter, StorageConfig, TicketFetcher};
use telemetry::metrics;
use ticket_core::schema::validate_enrichment;
use ticket_core::{
    parse_notification, EnrichedRecord, EnrichmentResult, Error, ProcessingUnit, RawTicket,
    Result, StructuredProjection,
};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::gateway::{EnrichmentGateway, GatewayConfig};
use crate::stats::ProcessingStats;

/// Processor settings drawn from the queue, storage and gateway configs.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Bucket for direct `{"key": ..}` notifications
    pub raw_bucket: String,
    /// Pause after an empty or failed poll
    pub empty_poll_backoff: Duration,
    /// Receive count at which a message is reported as poison
    pub poison_receive_count: u32,
    /// Upper bound for one gateway call
    pub enrich_timeout: Duration,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self::from_parts(
            &QueueConfig::default(),
            &StorageConfig::default(),
            &GatewayConfig::default(),
        )
    }
}

impl ProcessorConfig {
    pub fn from_parts(queue: &QueueConfig, storage: &StorageConfig, gateway: &GatewayConfig) -> Self {
        Self {
            raw_bucket: storage.raw_bucket.clone(),
            empty_poll_backoff: queue.empty_poll_backoff(),
            poison_receive_count: queue.poison_receive_count,
            enrich_timeout: gateway.timeout(),
        }
    }
}

/// What happened to a message after dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Every unit stored and the message deleted
    Acknowledged,
    /// Left on the queue for redelivery
    Retained,
}

/// The pipeline orchestrator.
pub struct TicketProcessor {
    queue: Arc<dyn MessageQueue>,
    fetcher: TicketFetcher,
    gateway: Arc<dyn EnrichmentGateway>,
    writer: DualStoreWriter,
    config: ProcessorConfig,
    stats: ProcessingStats,
}

impl TicketProcessor {
    /// The gateway must already be built and probed.
    pub fn new(
        queue: Arc<dyn MessageQueue>,
        fetcher: TicketFetcher,
        gateway: Arc<dyn EnrichmentGateway>,
        writer: DualStoreWriter,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            queue,
            fetcher,
            gateway,
            writer,
            config,
            stats: ProcessingStats::new(),
        }
    }

    pub fn stats(&self) -> &ProcessingStats {
        &self.stats
    }

    /// Runs until `shutdown` flips to true or its sender is dropped.
    ///
    /// Shutdown interrupts a long poll or a backoff sleep. A message already
    /// being processed is finished; the rest of its batch is left for
    /// redelivery.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(
            queue = self.queue.name(),
            raw_bucket = %self.config.raw_bucket,
            enriched_bucket = %self.writer.enriched_bucket(),
            model_version = self.gateway.model_version(),
            "Ticket processor starting"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let received = tokio::select! {
                _ = shutdown.changed() => break,
                received = self.queue.receive() => received,
            };

            let messages = match received {
                Ok(messages) => messages,
                Err(e) => {
                    metrics().poll_errors.inc();
                    error!(error = %e, code = e.code(), "Queue poll failed");
                    if Self::pause(&mut shutdown, self.config.empty_poll_backoff).await {
                        break;
                    }
                    continue;
                }
            };

            if messages.is_empty() {
                debug!("No messages");
                if Self::pause(&mut shutdown, self.config.empty_poll_backoff).await {
                    break;
                }
                continue;
            }

            let total = messages.len();
            for (done, message) in messages.iter().enumerate() {
                if *shutdown.borrow() {
                    info!(
                        abandoned = total - done,
                        "Shutdown requested, leaving rest of batch for redelivery"
                    );
                    break;
                }
                self.handle_message(message).await;
            }
        }

        info!("Ticket processor stopped");
        Ok(())
    }

    /// Sleeps for `delay`; returns true if shutdown was requested meanwhile.
    async fn pause(shutdown: &mut watch::Receiver<bool>, delay: Duration) -> bool {
        tokio::select! {
            _ = shutdown.changed() => true,
            _ = tokio::time::sleep(delay) => false,
        }
    }

    /// Receives one batch and dispatches every message in it.
    pub async fn poll_once(&mut self) -> Result<Vec<MessageOutcome>> {
        let messages = self.queue.receive().await.inspect_err(|_| {
            metrics().poll_errors.inc();
        })?;

        let mut outcomes = Vec::with_capacity(messages.len());
        for message in &messages {
            outcomes.push(self.handle_message(message).await);
        }
        Ok(outcomes)
    }

    /// Processes every unit in `message`, then deletes it if all succeeded.
    ///
    /// Never fails: every error is unit-local and results in `Retained`.
    pub async fn handle_message(&mut self, message: &QueueMessage) -> MessageOutcome {
        metrics().messages_received.inc();

        if let Some(count) = message.receive_count {
            if count >= self.config.poison_receive_count {
                metrics().poison_messages.inc();
                warn!(
                    message_id = %message.message_id,
                    receive_count = count,
                    "Message keeps failing; it will be retried until removed by an operator"
                );
            }
        }

        let units = match parse_notification(&message.body, &self.config.raw_bucket) {
            Ok(units) => units,
            Err(e) => {
                self.record_failure();
                warn!(
                    message_id = %message.message_id,
                    error = %e,
                    code = e.code(),
                    "Unparseable notification"
                );
                return self.retain(message);
            }
        };

        if units.is_empty() {
            debug!(message_id = %message.message_id, "Notification has no units");
        }

        for unit in &units {
            match self.process_unit(unit).await {
                Ok(_) => {
                    self.stats.record_success();
                    metrics().units_processed.inc();
                }
                Err(e) => {
                    self.record_failure();
                    error!(
                        message_id = %message.message_id,
                        unit = %unit,
                        error = %e,
                        code = e.code(),
                        "Unit failed"
                    );
                    return self.retain(message);
                }
            }
        }

        self.acknowledge(message).await
    }

    fn record_failure(&mut self) {
        self.stats.record_failure();
        metrics().units_failed.inc();
    }

    fn retain(&self, message: &QueueMessage) -> MessageOutcome {
        metrics().messages_retained.inc();
        debug!(message_id = %message.message_id, "Message retained for redelivery");
        MessageOutcome::Retained
    }

    async fn acknowledge(&self, message: &QueueMessage) -> MessageOutcome {
        match self.queue.delete(message).await {
            Ok(()) => {
                metrics().messages_acknowledged.inc();
                debug!(message_id = %message.message_id, "Message acknowledged");
                MessageOutcome::Acknowledged
            }
            Err(e) => {
                // Units are stored; redelivery rewrites the same keys.
                metrics().ack_errors.inc();
                warn!(
                    message_id = %message.message_id,
                    error = %e,
                    "Failed to delete processed message"
                );
                self.retain(message)
            }
        }
    }

    /// Fetch → enrich → store for one unit.
    pub async fn process_unit(&self, unit: &ProcessingUnit) -> Result<StructuredProjection> {
        let start = Instant::now();

        let ticket = self.fetcher.fetch(unit).await?;
        metrics()
            .fetch_latency_ms
            .observe(start.elapsed().as_millis() as u64);

        let enrich_start = Instant::now();
        let enrichment = self.enrich(&ticket).await?;
        metrics()
            .enrich_latency_ms
            .observe(enrich_start.elapsed().as_millis() as u64);

        let record = EnrichedRecord::from_raw(ticket, enrichment);
        let projection = self.writer.write(&record).await?;

        let latency_ms = start.elapsed().as_millis() as u64;
        metrics().unit_latency_ms.observe(latency_ms);

        info!(
            ticket_id = %projection.ticket_id,
            intent = %projection.intent,
            urgency = %projection.urgency,
            sentiment = %projection.sentiment,
            latency_ms,
            "Processed ticket"
        );
        Ok(projection)
    }

    /// Calls the gateway under the configured timeout and checks the result.
    async fn enrich(&self, ticket: &RawTicket) -> Result<EnrichmentResult> {
        let result = tokio::time::timeout(self.config.enrich_timeout, self.gateway.enrich(ticket))
            .await
            .map_err(|_| {
                Error::enrichment(format!(
                    "enrich {} timed out after {:?}",
                    ticket.ticket_id, self.config.enrich_timeout
                ))
            })?
            .map_err(|e| match e {
                Error::Enrichment(_) => e,
                other => Error::enrichment(format!("enrich {}: {}", ticket.ticket_id, other)),
            })?;

        validate_enrichment(&result)?;
        Ok(result)
    }
}

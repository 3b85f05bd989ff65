//! Common test setup functions.

use std::sync::Arc;
use std::time::Duration;

use queue::{MessageQueue, QueueMessage};
use storage::{BlobStore, DualStoreWriter, ProjectionStore, TicketFetcher};
use worker::{EnrichmentGateway, MessageOutcome, ProcessorConfig, TicketProcessor};

use crate::fixtures::{self, ENRICHED_BUCKET, RAW_BUCKET};
use crate::mocks::{MockBlobStore, MockGateway, MockProjectionStore, MockQueue};

/// Processor wired to in-memory collaborators.
///
/// The mocks are shared with the processor, so tests can inject failures
/// and inspect stored output while it runs.
pub struct TestContext {
    pub queue: MockQueue,
    pub blobs: MockBlobStore,
    pub projections: MockProjectionStore,
    pub gateway: MockGateway,
    pub processor: TicketProcessor,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(ProcessorConfig {
            raw_bucket: RAW_BUCKET.to_string(),
            empty_poll_backoff: Duration::from_millis(10),
            poison_receive_count: 5,
            enrich_timeout: Duration::from_millis(500),
        })
    }

    pub fn with_config(config: ProcessorConfig) -> Self {
        let queue = MockQueue::new();
        let blobs = MockBlobStore::new();
        let projections = MockProjectionStore::new();
        let gateway = MockGateway::new();

        let blob_store: Arc<dyn BlobStore> = Arc::new(blobs.clone());
        let projection_store: Arc<dyn ProjectionStore> = Arc::new(projections.clone());

        let processor = TicketProcessor::new(
            Arc::new(queue.clone()) as Arc<dyn MessageQueue>,
            TicketFetcher::new(blob_store.clone()),
            Arc::new(gateway.clone()) as Arc<dyn EnrichmentGateway>,
            DualStoreWriter::new(blob_store, projection_store, ENRICHED_BUCKET),
            config,
        );

        Self {
            queue,
            blobs,
            projections,
            gateway,
            processor,
        }
    }

    /// Stores a raw ticket at `tickets-raw/{ticket_id}.json` and returns the key.
    pub fn seed_ticket(&self, ticket: &serde_json::Value) -> String {
        let id = ticket["ticket_id"].as_str().unwrap_or("unknown");
        let key = format!("{}.json", id);
        self.blobs.insert(RAW_BUCKET, &key, fixtures::to_bytes(ticket));
        key
    }

    /// Processes one message directly.
    pub async fn handle(&mut self, message: &QueueMessage) -> MessageOutcome {
        self.processor.handle_message(message).await
    }

    /// Queues one batch and processes it.
    pub async fn run_batch(&mut self, batch: Vec<QueueMessage>) -> Vec<MessageOutcome> {
        self.queue.push_batch(batch);
        self.processor.poll_once().await.expect("mock receive succeeds")
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

//! Queue abstraction consumed by the worker loop.

use async_trait::async_trait;
use ticket_core::Result;

/// A received notification, valid until its visibility timeout elapses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub message_id: String,
    /// Handle used to acknowledge (delete) this delivery
    pub receipt_handle: String,
    pub body: String,
    /// Approximate number of times this message has been received
    pub receive_count: Option<u32>,
}

/// Source of notification batches with explicit acknowledgment.
///
/// Messages that are never deleted become visible again after the
/// redelivery timeout.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Long-polls for the next batch. An empty batch is not an error.
    async fn receive(&self) -> Result<Vec<QueueMessage>>;

    /// Acknowledges a message so it is never redelivered.
    async fn delete(&self, message: &QueueMessage) -> Result<()>;

    /// Human-readable queue identifier for logs.
    fn name(&self) -> &str;
}

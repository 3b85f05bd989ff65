//! Queue configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// SQS consumer configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QueueConfig {
    /// Queue name (resolved to a URL at startup)
    #[validate(length(min = 1, max = 80))]
    #[serde(default = "default_queue_name")]
    pub queue_name: String,
    /// Long-poll wait in seconds
    #[validate(range(min = 0, max = 20))]
    #[serde(default = "default_wait_time_secs")]
    pub wait_time_secs: i32,
    /// Maximum messages per receive
    #[validate(range(min = 1, max = 10))]
    #[serde(default = "default_max_messages")]
    pub max_messages: i32,
    /// Redelivery timeout in seconds, sent with each receive
    #[validate(range(min = 0, max = 43200))]
    #[serde(default = "default_visibility_timeout_secs")]
    pub visibility_timeout_secs: i32,
    /// Sleep after an empty or failed poll
    #[serde(default = "default_empty_poll_backoff_ms")]
    pub empty_poll_backoff_ms: u64,
    /// Receive count at which a message is reported as poison
    #[validate(range(min = 1))]
    #[serde(default = "default_poison_receive_count")]
    pub poison_receive_count: u32,
}

fn default_queue_name() -> String {
    "ticket-processing-queue".to_string()
}

fn default_wait_time_secs() -> i32 {
    20
}

fn default_max_messages() -> i32 {
    10
}

fn default_visibility_timeout_secs() -> i32 {
    300
}

fn default_empty_poll_backoff_ms() -> u64 {
    1000
}

fn default_poison_receive_count() -> u32 {
    5
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            queue_name: default_queue_name(),
            wait_time_secs: default_wait_time_secs(),
            max_messages: default_max_messages(),
            visibility_timeout_secs: default_visibility_timeout_secs(),
            empty_poll_backoff_ms: default_empty_poll_backoff_ms(),
            poison_receive_count: default_poison_receive_count(),
        }
    }
}

impl QueueConfig {
    pub fn empty_poll_backoff(&self) -> Duration {
        Duration::from_millis(self.empty_poll_backoff_ms)
    }

    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_secs.max(0) as u64)
    }
}

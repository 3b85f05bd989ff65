//! SQS-backed message queue.
//!
//! Uses long polling with the configured wait, batch size, and visibility
//! timeout. Acknowledgment is an explicit delete by receipt handle, which
//! gives at-least-once delivery.

use async_trait::async_trait;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::{Message, MessageSystemAttributeName};
use aws_sdk_sqs::Client;
use ticket_core::{Error, Result};
use tracing::{debug, info, warn};

use crate::config::QueueConfig;
use crate::message::{MessageQueue, QueueMessage};

/// SQS consumer bound to a single queue URL.
pub struct SqsQueue {
    client: Client,
    queue_url: String,
    config: QueueConfig,
}

impl SqsQueue {
    /// Resolves the queue URL and creates the consumer.
    pub async fn connect(sdk_config: &aws_config::SdkConfig, config: QueueConfig) -> Result<Self> {
        let client = Client::new(sdk_config);

        let output = client
            .get_queue_url()
            .queue_name(&config.queue_name)
            .send()
            .await
            .map_err(|e| {
                Error::queue(format!(
                    "failed to resolve queue {}: {}",
                    config.queue_name,
                    DisplayErrorContext(&e)
                ))
            })?;

        let queue_url = output
            .queue_url()
            .ok_or_else(|| Error::queue(format!("no URL returned for {}", config.queue_name)))?
            .to_string();

        info!(
            queue = %config.queue_name,
            url = %queue_url,
            wait_secs = config.wait_time_secs,
            max_messages = config.max_messages,
            visibility_timeout_secs = config.visibility_timeout_secs,
            "Created SQS consumer"
        );

        Ok(Self {
            client,
            queue_url,
            config,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }
}

/// Converts an SQS message, dropping deliveries that cannot be acknowledged.
fn to_queue_message(message: &Message) -> Option<QueueMessage> {
    let receipt_handle = message.receipt_handle()?.to_string();
    let receive_count = message
        .attributes()
        .and_then(|attrs| attrs.get(&MessageSystemAttributeName::ApproximateReceiveCount))
        .and_then(|v| v.parse().ok());

    Some(QueueMessage {
        message_id: message.message_id().unwrap_or("unknown").to_string(),
        receipt_handle,
        body: message.body().unwrap_or_default().to_string(),
        receive_count,
    })
}

#[async_trait]
impl MessageQueue for SqsQueue {
    async fn receive(&self) -> Result<Vec<QueueMessage>> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(self.config.max_messages)
            .wait_time_seconds(self.config.wait_time_secs)
            .visibility_timeout(self.config.visibility_timeout_secs)
            .message_system_attribute_names(MessageSystemAttributeName::ApproximateReceiveCount)
            .send()
            .await
            .map_err(|e| Error::queue(format!("receive failed: {}", DisplayErrorContext(&e))))?;

        let messages: Vec<QueueMessage> = output
            .messages()
            .iter()
            .filter_map(|m| {
                let converted = to_queue_message(m);
                if converted.is_none() {
                    warn!(
                        message_id = m.message_id().unwrap_or("unknown"),
                        "Dropping message without receipt handle"
                    );
                }
                converted
            })
            .collect();

        debug!(count = messages.len(), queue = %self.config.queue_name, "Received messages");
        Ok(messages)
    }

    async fn delete(&self, message: &QueueMessage) -> Result<()> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(&message.receipt_handle)
            .send()
            .await
            .map_err(|e| {
                Error::queue(format!(
                    "delete of {} failed: {}",
                    message.message_id,
                    DisplayErrorContext(&e)
                ))
            })?;

        debug!(message_id = %message.message_id, "Message deleted from queue");
        Ok(())
    }

    fn name(&self) -> &str {
        &self.config.queue_name
    }
}

//! Queue health checks.

use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::QueueAttributeName;
use tracing::{debug, error};

use crate::sqs::SqsQueue;

/// Checks the queue is reachable and logs its approximate depth.
pub async fn check_connection(queue: &SqsQueue) -> bool {
    let result = queue
        .client()
        .get_queue_attributes()
        .queue_url(queue.queue_url())
        .attribute_names(QueueAttributeName::ApproximateNumberOfMessages)
        .send()
        .await;

    match result {
        Ok(output) => {
            let depth = output
                .attributes()
                .and_then(|attrs| attrs.get(&QueueAttributeName::ApproximateNumberOfMessages))
                .map(String::as_str)
                .unwrap_or("unknown");
            debug!(queue = %queue.config().queue_name, depth, "Queue connection healthy");
            true
        }
        Err(e) => {
            error!(
                queue = %queue.config().queue_name,
                "Queue health check failed: {}",
                DisplayErrorContext(&e)
            );
            false
        }
    }
}

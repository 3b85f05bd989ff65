//! Store health checks.

use aws_sdk_dynamodb::error::DisplayErrorContext as DynamoErrorContext;
use aws_sdk_s3::error::DisplayErrorContext as S3ErrorContext;
use tracing::{debug, error};

use crate::blob::S3BlobStore;
use crate::table::DynamoProjectionStore;

/// Checks a bucket exists and is accessible.
pub async fn check_bucket(store: &S3BlobStore, bucket: &str) -> bool {
    match store.client().head_bucket().bucket(bucket).send().await {
        Ok(_) => {
            debug!(bucket, "Bucket healthy");
            true
        }
        Err(e) => {
            error!(bucket, "Bucket health check failed: {}", S3ErrorContext(&e));
            false
        }
    }
}

/// Checks the projection table exists.
pub async fn check_table(store: &DynamoProjectionStore) -> bool {
    match store
        .client()
        .describe_table()
        .table_name(store.table_name())
        .send()
        .await
    {
        Ok(_) => {
            debug!(table = store.table_name(), "Table healthy");
            true
        }
        Err(e) => {
            error!(
                table = store.table_name(),
                "Table health check failed: {}",
                DynamoErrorContext(&e)
            );
            false
        }
    }
}

//! Blob storage for raw and enriched ticket documents.

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use ticket_core::{Error, Result};
use tracing::{debug, info};

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Object storage addressed by `(bucket, key)`.
///
/// `get` fails with a fetch error; `put_json` fails with a storage error.
/// `put_json` overwrites any existing object under the same key.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes>;

    async fn put_json(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()>;
}

/// S3 implementation of [`BlobStore`].
#[derive(Clone)]
pub struct S3BlobStore {
    client: Client,
}

impl S3BlobStore {
    /// Creates the store. LocalStack needs path-style addressing.
    pub fn new(sdk_config: &aws_config::SdkConfig, force_path_style: bool) -> Self {
        let s3_config = aws_sdk_s3::config::Builder::from(sdk_config)
            .force_path_style(force_path_style)
            .build();

        info!(force_path_style, "Created S3 client");

        Self {
            client: Client::from_conf(s3_config),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let missing = e
                    .as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false);
                if missing {
                    Error::fetch(format!("s3://{}/{} does not exist", bucket, key))
                } else {
                    Error::fetch(format!(
                        "get s3://{}/{} failed: {}",
                        bucket,
                        key,
                        DisplayErrorContext(&e)
                    ))
                }
            })?;

        let body = output.body.collect().await.map_err(|e| {
            Error::fetch(format!("reading s3://{}/{} failed: {}", bucket, key, e))
        })?;

        let bytes = body.into_bytes();
        debug!(bucket, key, size = bytes.len(), "Fetched object");
        Ok(bytes)
    }

    async fn put_json(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()> {
        let size = body.len();

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(JSON_CONTENT_TYPE)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                Error::storage(format!(
                    "put s3://{}/{} failed: {}",
                    bucket,
                    key,
                    DisplayErrorContext(&e)
                ))
            })?;

        debug!(bucket, key, size, "Stored object");
        Ok(())
    }
}

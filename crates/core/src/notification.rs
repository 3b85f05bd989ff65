//! Queue notification parsing.
//!
//! A message body is either an S3 event envelope
//! (`{"Records": [{"s3": {"bucket": {"name": ..}, "object": {"key": ..}}}]}`)
//! or a direct reference (`{"key": ..}`) resolved against the raw bucket.

use serde::Deserialize;
use std::fmt;

use crate::error::{Error, Result};

/// S3 test notification sent when bucket notifications are configured.
const S3_TEST_EVENT: &str = "s3:TestEvent";

/// One raw document to process, extracted from a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingUnit {
    pub bucket: String,
    pub key: String,
}

impl ProcessingUnit {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ProcessingUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "Records")]
    records: Option<Vec<EventRecord>>,
    #[serde(alias = "Key")]
    key: Option<String>,
    bucket: Option<String>,
    #[serde(rename = "Event")]
    event: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventRecord {
    s3: Option<S3Entity>,
    /// Hand-written records carry a bare key.
    #[serde(alias = "Key")]
    key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    bucket: S3Bucket,
    object: S3Object,
}

#[derive(Debug, Deserialize)]
struct S3Bucket {
    name: String,
}

#[derive(Debug, Deserialize)]
struct S3Object {
    key: String,
}

/// Parse a queue message body into processing units.
///
/// Any unusable record fails the whole message; there is no partial result.
/// An S3 test event yields no units.
pub fn parse_notification(body: &str, default_bucket: &str) -> Result<Vec<ProcessingUnit>> {
    if body.trim().is_empty() {
        return Err(Error::parse("empty message body"));
    }

    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|e| Error::parse(format!("invalid notification JSON: {}", e)))?;

    if let Some(records) = envelope.records {
        return records
            .into_iter()
            .enumerate()
            .map(|(i, record)| unit_from_record(i, record, default_bucket))
            .collect();
    }

    if envelope.event.as_deref() == Some(S3_TEST_EVENT) {
        return Ok(Vec::new());
    }

    match envelope.key {
        Some(key) if !key.is_empty() => {
            let bucket = envelope
                .bucket
                .filter(|b| !b.is_empty())
                .unwrap_or_else(|| default_bucket.to_string());
            Ok(vec![ProcessingUnit::new(bucket, key)])
        }
        Some(_) => Err(Error::parse("empty object key")),
        None => Err(Error::parse(
            "notification has neither Records nor a key reference",
        )),
    }
}

fn unit_from_record(
    index: usize,
    record: EventRecord,
    default_bucket: &str,
) -> Result<ProcessingUnit> {
    match (record.s3, record.key) {
        (Some(s3), _) => {
            if s3.bucket.name.is_empty() || s3.object.key.is_empty() {
                return Err(Error::parse(format!(
                    "record {} has an empty bucket or key",
                    index
                )));
            }
            let key = decode_event_key(&s3.object.key)
                .map_err(|e| Error::parse(format!("record {} key: {}", index, e)))?;
            Ok(ProcessingUnit::new(s3.bucket.name, key))
        }
        (None, Some(key)) if !key.is_empty() => Ok(ProcessingUnit::new(default_bucket, key)),
        _ => Err(Error::parse(format!("record {} has no object key", index))),
    }
}

/// S3 event keys arrive URL-encoded with `+` for space. The whole key is
/// decoded; `=` and `&` are ordinary key characters.
fn decode_event_key(key: &str) -> std::result::Result<String, std::string::FromUtf8Error> {
    urlencoding::decode(&key.replace('+', " ")).map(|decoded| decoded.into_owned())
}

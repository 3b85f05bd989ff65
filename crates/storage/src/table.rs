//! Projection store backed by the DynamoDB metadata table.

use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use ticket_core::{Error, Result, StructuredProjection, Urgency};
use tracing::{debug, info};

use crate::schema::{PARTITION_KEY, SORT_KEY, URGENCY_ATTRIBUTE};

/// Indexed store of compact ticket projections.
///
/// `put` is an upsert on `(ticket_id, created_at)`.
#[async_trait]
pub trait ProjectionStore: Send + Sync {
    async fn put(&self, projection: &StructuredProjection) -> Result<()>;

    async fn get(&self, ticket_id: &str, created_at: i64) -> Result<Option<StructuredProjection>>;

    /// Projections with the given urgency, newest first.
    async fn query_by_urgency(
        &self,
        urgency: Urgency,
        limit: i32,
    ) -> Result<Vec<StructuredProjection>>;
}

type Item = HashMap<String, AttributeValue>;

/// Converts a projection to a DynamoDB item.
pub fn to_item(projection: &StructuredProjection) -> Item {
    let s = |v: &str| AttributeValue::S(v.to_string());

    HashMap::from([
        (PARTITION_KEY.to_string(), s(&projection.ticket_id)),
        (
            SORT_KEY.to_string(),
            AttributeValue::N(projection.created_at.to_string()),
        ),
        ("subject".to_string(), s(&projection.subject)),
        ("customer_id".to_string(), s(&projection.customer_id)),
        ("intent".to_string(), s(&projection.intent)),
        (URGENCY_ATTRIBUTE.to_string(), s(projection.urgency.as_str())),
        ("sentiment".to_string(), s(projection.sentiment.as_str())),
        ("summary".to_string(), s(&projection.summary)),
        (
            "processed_at".to_string(),
            s(&projection.processed_at.to_rfc3339()),
        ),
        ("s3_key".to_string(), s(&projection.s3_key)),
    ])
}

fn string_attr(item: &Item, name: &str) -> Result<String> {
    match item.get(name) {
        Some(AttributeValue::S(v)) => Ok(v.clone()),
        Some(_) => Err(Error::storage(format!("attribute {} is not a string", name))),
        None => Err(Error::storage(format!("attribute {} is missing", name))),
    }
}

/// Converts a DynamoDB item back to a projection.
pub fn from_item(item: &Item) -> Result<StructuredProjection> {
    let created_at = match item.get(SORT_KEY) {
        Some(AttributeValue::N(n)) => n
            .parse::<i64>()
            .map_err(|e| Error::storage(format!("bad {}: {}", SORT_KEY, e)))?,
        _ => return Err(Error::storage(format!("attribute {} is missing", SORT_KEY))),
    };

    let processed_at = string_attr(item, "processed_at")?;
    let processed_at = DateTime::parse_from_rfc3339(&processed_at)
        .map_err(|e| Error::storage(format!("bad processed_at: {}", e)))?
        .with_timezone(&Utc);

    Ok(StructuredProjection {
        ticket_id: string_attr(item, PARTITION_KEY)?,
        created_at,
        subject: string_attr(item, "subject")?,
        customer_id: string_attr(item, "customer_id")?,
        intent: string_attr(item, "intent")?,
        urgency: string_attr(item, URGENCY_ATTRIBUTE)?
            .parse()
            .map_err(|e: Error| Error::storage(e.to_string()))?,
        sentiment: string_attr(item, "sentiment")?
            .parse()
            .map_err(|e: Error| Error::storage(e.to_string()))?,
        summary: string_attr(item, "summary")?,
        processed_at,
        s3_key: string_attr(item, "s3_key")?,
    })
}

/// DynamoDB implementation of [`ProjectionStore`].
#[derive(Clone)]
pub struct DynamoProjectionStore {
    client: Client,
    table_name: String,
    urgency_index: String,
}

impl DynamoProjectionStore {
    pub fn new(
        sdk_config: &aws_config::SdkConfig,
        table_name: impl Into<String>,
        urgency_index: impl Into<String>,
    ) -> Self {
        let table_name = table_name.into();
        info!(table = %table_name, "Created DynamoDB client");

        Self {
            client: Client::new(sdk_config),
            table_name,
            urgency_index: urgency_index.into(),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

#[async_trait]
impl ProjectionStore for DynamoProjectionStore {
    async fn put(&self, projection: &StructuredProjection) -> Result<()> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(to_item(projection)))
            .send()
            .await
            .map_err(|e| {
                Error::storage(format!(
                    "put projection {} failed: {}",
                    projection.ticket_id,
                    DisplayErrorContext(&e)
                ))
            })?;

        let (ticket_id, created_at) = projection.key();
        debug!(
            ticket_id = %ticket_id,
            created_at,
            table = %self.table_name,
            "Stored projection"
        );
        Ok(())
    }

    async fn get(&self, ticket_id: &str, created_at: i64) -> Result<Option<StructuredProjection>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(PARTITION_KEY, AttributeValue::S(ticket_id.to_string()))
            .key(SORT_KEY, AttributeValue::N(created_at.to_string()))
            .send()
            .await
            .map_err(|e| {
                Error::storage(format!(
                    "get projection {} failed: {}",
                    ticket_id,
                    DisplayErrorContext(&e)
                ))
            })?;

        output.item().map(from_item).transpose()
    }

    async fn query_by_urgency(
        &self,
        urgency: Urgency,
        limit: i32,
    ) -> Result<Vec<StructuredProjection>> {
        let output = self
            .client
            .query()
            .table_name(&self.table_name)
            .index_name(&self.urgency_index)
            .key_condition_expression("urgency = :u")
            .expression_attribute_values(":u", AttributeValue::S(urgency.as_str().to_string()))
            .scan_index_forward(false)
            .limit(limit)
            .send()
            .await
            .map_err(|e| {
                Error::storage(format!(
                    "query {} on {} failed: {}",
                    urgency,
                    self.urgency_index,
                    DisplayErrorContext(&e)
                ))
            })?;

        output.items().iter().map(from_item).collect()
    }
}

//! Metadata table layout.
//!
//! - Partition key `ticket_id` (S), sort key `created_at` (N)
//! - GSI on `urgency` (S) with `created_at` as range, all attributes projected
//!
//! Production tables are provisioned outside this service; `create_table`
//! exists for local environments and tests.

use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, GlobalSecondaryIndex, KeySchemaElement, KeyType,
    Projection, ProjectionType, ScalarAttributeType,
};
use aws_sdk_dynamodb::Client;
use ticket_core::{Error, Result};
use tracing::info;

pub const PARTITION_KEY: &str = "ticket_id";
pub const SORT_KEY: &str = "created_at";
pub const URGENCY_ATTRIBUTE: &str = "urgency";
pub const DEFAULT_URGENCY_INDEX: &str = "urgency-index";

fn attribute(name: &str, kind: ScalarAttributeType) -> Result<AttributeDefinition> {
    AttributeDefinition::builder()
        .attribute_name(name)
        .attribute_type(kind)
        .build()
        .map_err(|e| Error::storage(format!("attribute definition {}: {}", name, e)))
}

fn key(name: &str, kind: KeyType) -> Result<KeySchemaElement> {
    KeySchemaElement::builder()
        .attribute_name(name)
        .key_type(kind)
        .build()
        .map_err(|e| Error::storage(format!("key schema {}: {}", name, e)))
}

/// Creates the projection table with its urgency index.
pub async fn create_table(client: &Client, table_name: &str, urgency_index: &str) -> Result<()> {
    let index = GlobalSecondaryIndex::builder()
        .index_name(urgency_index)
        .key_schema(key(URGENCY_ATTRIBUTE, KeyType::Hash)?)
        .key_schema(key(SORT_KEY, KeyType::Range)?)
        .projection(
            Projection::builder()
                .projection_type(ProjectionType::All)
                .build(),
        )
        .build()
        .map_err(|e| Error::storage(format!("index {}: {}", urgency_index, e)))?;

    client
        .create_table()
        .table_name(table_name)
        .attribute_definitions(attribute(PARTITION_KEY, ScalarAttributeType::S)?)
        .attribute_definitions(attribute(SORT_KEY, ScalarAttributeType::N)?)
        .attribute_definitions(attribute(URGENCY_ATTRIBUTE, ScalarAttributeType::S)?)
        .key_schema(key(PARTITION_KEY, KeyType::Hash)?)
        .key_schema(key(SORT_KEY, KeyType::Range)?)
        .global_secondary_indexes(index)
        .billing_mode(BillingMode::PayPerRequest)
        .send()
        .await
        .map_err(|e| {
            Error::storage(format!(
                "create table {} failed: {}",
                table_name,
                DisplayErrorContext(&e)
            ))
        })?;

    info!(table = table_name, index = urgency_index, "Created projection table");
    Ok(())
}

//! Ticket stores: raw/enriched blobs in S3 and projections in DynamoDB.

pub mod blob;
pub mod config;
pub mod fetch;
pub mod health;
pub mod schema;
pub mod table;
pub mod writer;

pub use blob::*;
pub use config::*;
pub use fetch::*;
pub use table::*;
pub use writer::*;

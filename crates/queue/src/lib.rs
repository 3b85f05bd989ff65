//! SQS notification queue for the ticket enrichment worker.

pub mod config;
pub mod health;
pub mod message;
pub mod sqs;

pub use config::*;
pub use message::*;
pub use sqs::*;

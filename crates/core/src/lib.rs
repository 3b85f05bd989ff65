//! Core types, notification parsing, and validation for the ticket
//! enrichment worker.

pub mod aws;
pub mod error;
pub mod limits;
pub mod notification;
pub mod schema;
pub mod tickets;

pub use aws::*;
pub use error::{Error, Result};
pub use notification::*;
pub use tickets::*;

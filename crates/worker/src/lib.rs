//! Ticket enrichment worker.
//!
//! - Gateways (local heuristics or a remote enrichment service)
//! - Processor (queue → fetch → enrich → dual-store write → ack)
//! - Processing stats

pub mod gateway;
pub mod processor;
pub mod stats;

pub use gateway::{build_gateway, EnrichmentGateway, GatewayConfig, GatewayMode, LocalGateway, RemoteGateway};
pub use processor::*;
pub use stats::*;

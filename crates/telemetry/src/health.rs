//! Health check aggregation.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Health status for the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Component health state.
#[derive(Debug)]
pub struct ComponentHealth {
    name: &'static str,
    healthy: AtomicBool,
    message: parking_lot::RwLock<Option<String>>,
}

impl ComponentHealth {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            healthy: AtomicBool::new(false),
            message: parking_lot::RwLock::new(None),
        }
    }

    pub fn set_healthy(&self) {
        self.healthy.store(true, Ordering::Relaxed);
        *self.message.write() = None;
    }

    pub fn set_unhealthy(&self, msg: impl Into<String>) {
        self.healthy.store(false, Ordering::Relaxed);
        *self.message.write() = Some(msg.into());
    }

    /// Record the outcome of a probe.
    pub fn record(&self, ok: bool, failure: &str) {
        if ok {
            self.set_healthy();
        } else {
            self.set_unhealthy(failure);
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn message(&self) -> Option<String> {
        self.message.read().clone()
    }

    fn report(&self) -> ComponentHealthReport {
        ComponentHealthReport {
            name: self.name.to_string(),
            healthy: self.is_healthy(),
            message: self.message(),
        }
    }
}

/// Aggregated health status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub components: Vec<ComponentHealthReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealthReport {
    pub name: String,
    pub healthy: bool,
    pub message: Option<String>,
}

/// Health of every external dependency of the worker.
pub struct HealthRegistry {
    pub queue: ComponentHealth,
    pub raw_bucket: ComponentHealth,
    pub enriched_bucket: ComponentHealth,
    pub table: ComponentHealth,
    pub gateway: ComponentHealth,
}

impl HealthRegistry {
    pub const fn new() -> Self {
        Self {
            queue: ComponentHealth::new("queue"),
            raw_bucket: ComponentHealth::new("raw_bucket"),
            enriched_bucket: ComponentHealth::new("enriched_bucket"),
            table: ComponentHealth::new("table"),
            gateway: ComponentHealth::new("gateway"),
        }
    }

    fn components(&self) -> [&ComponentHealth; 5] {
        [
            &self.queue,
            &self.raw_bucket,
            &self.enriched_bucket,
            &self.table,
            &self.gateway,
        ]
    }

    /// Generate a health report.
    pub fn report(&self) -> HealthReport {
        let components: Vec<_> = self.components().iter().map(|c| c.report()).collect();

        let status = if components.iter().all(|c| c.healthy) {
            HealthStatus::Healthy
        } else if self.is_ready() {
            HealthStatus::Degraded
        } else {
            HealthStatus::Unhealthy
        };

        HealthReport { status, components }
    }

    /// The worker can make progress only with a queue and a gateway.
    pub fn is_ready(&self) -> bool {
        self.queue.is_healthy() && self.gateway.is_healthy()
    }
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Global health registry.
pub static HEALTH: std::sync::LazyLock<HealthRegistry> =
    std::sync::LazyLock::new(HealthRegistry::new);

/// Get the global health registry.
pub fn health() -> &'static HealthRegistry {
    &HEALTH
}

//! Process metrics for the worker.
//!
//! Counters and latency histograms are observational only; nothing in the
//! pipeline reads them to make decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A monotonically increasing counter.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Latency histogram in milliseconds.
///
/// Bounds run up to a minute because a single enrichment call can take
/// seconds on a cold model.
#[derive(Debug)]
pub struct Histogram {
    buckets: [AtomicU64; 10],
    sum: AtomicU64,
    count: AtomicU64,
    max: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 10] = [5, 10, 25, 50, 100, 250, 1000, 5000, 15000, 60000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
            max: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.max.fetch_max(ms, Ordering::Relaxed);

        let idx = Self::BUCKET_BOUNDS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(Self::BUCKET_BOUNDS.len() - 1);
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn max(&self) -> u64 {
        self.max.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum.load(Ordering::Relaxed) as f64 / count as f64
        }
    }

    /// Returns `(upper_bound_ms, count)` pairs.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the worker process.
#[derive(Debug, Default)]
pub struct Metrics {
    // Queue
    pub messages_received: Counter,
    pub messages_acknowledged: Counter,
    pub messages_retained: Counter,
    pub poll_errors: Counter,
    pub ack_errors: Counter,
    pub poison_messages: Counter,

    // Units
    pub units_processed: Counter,
    pub units_failed: Counter,

    // Latency
    pub fetch_latency_ms: Histogram,
    pub enrich_latency_ms: Histogram,
    pub store_latency_ms: Histogram,
    pub unit_latency_ms: Histogram,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            messages_received: self.messages_received.get(),
            messages_acknowledged: self.messages_acknowledged.get(),
            messages_retained: self.messages_retained.get(),
            poll_errors: self.poll_errors.get(),
            ack_errors: self.ack_errors.get(),
            poison_messages: self.poison_messages.get(),
            units_processed: self.units_processed.get(),
            units_failed: self.units_failed.get(),
            fetch_latency_mean_ms: self.fetch_latency_ms.mean(),
            enrich_latency_mean_ms: self.enrich_latency_ms.mean(),
            store_latency_mean_ms: self.store_latency_ms.mean(),
            unit_latency_mean_ms: self.unit_latency_ms.mean(),
            unit_latency_max_ms: self.unit_latency_ms.max(),
        }
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub messages_received: u64,
    pub messages_acknowledged: u64,
    pub messages_retained: u64,
    pub poll_errors: u64,
    pub ack_errors: u64,
    pub poison_messages: u64,
    pub units_processed: u64,
    pub units_failed: u64,
    pub fetch_latency_mean_ms: f64,
    pub enrich_latency_mean_ms: f64,
    pub store_latency_mean_ms: f64,
    pub unit_latency_mean_ms: f64,
    pub unit_latency_max_ms: u64,
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}

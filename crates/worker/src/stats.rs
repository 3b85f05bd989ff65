//! Per-process processing counters.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::info;

/// Counts of processed and failed units since start.
///
/// Owned by the processor; updated from a single task.
#[derive(Debug, Clone)]
pub struct ProcessingStats {
    processed: u64,
    failed: u64,
    start_time: DateTime<Utc>,
    started: Instant,
}

/// Point-in-time view of [`ProcessingStats`].
#[derive(Debug, Clone, Serialize)]
pub struct StatsSummary {
    pub processed: u64,
    pub failed: u64,
    pub start_time: DateTime<Utc>,
    pub uptime_secs: f64,
    /// Processed units per second
    pub throughput: f64,
}

impl Default for ProcessingStats {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingStats {
    pub fn new() -> Self {
        Self {
            processed: 0,
            failed: 0,
            start_time: Utc::now(),
            started: Instant::now(),
        }
    }

    pub fn record_success(&mut self) {
        self.processed += 1;
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Zero until any time has elapsed.
    pub fn throughput(&self) -> f64 {
        let secs = self.uptime().as_secs_f64();
        if secs > 0.0 {
            self.processed as f64 / secs
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary {
            processed: self.processed,
            failed: self.failed,
            start_time: self.start_time,
            uptime_secs: self.uptime().as_secs_f64(),
            throughput: self.throughput(),
        }
    }

    pub fn log_summary(&self) {
        let summary = self.summary();
        info!(
            processed = summary.processed,
            failed = summary.failed,
            uptime_secs = format!("{:.1}", summary.uptime_secs),
            throughput = format!("{:.2}/s", summary.throughput),
            "Processing statistics"
        );
    }
}

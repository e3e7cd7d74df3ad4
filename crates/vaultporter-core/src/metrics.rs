//! Lock-free metrics for transfer observability
//!
//! Design:
//! - Counter: Monotonically increasing atomic u64 values
//! - Histogram: Running count/sum/min/max behind a parking_lot lock
//! - TransferMetrics: The fixed set of metrics the transfer engine records

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// A lock-free counter metric (monotonically increasing)
#[derive(Debug, Clone)]
pub struct Counter {
    value: Arc<AtomicU64>,
    name: String,
}

impl Counter {
    /// Create a new counter with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            value: Arc::new(AtomicU64::new(0)),
            name: name.into(),
        }
    }

    /// Increment counter by 1
    pub fn increment(&self) {
        self.add(1);
    }

    /// Add value to counter (saturating)
    pub fn add(&self, value: u64) {
        let mut current = self.value.load(Ordering::Relaxed);
        loop {
            let new_value = current.saturating_add(value);
            match self.value.compare_exchange_weak(
                current,
                new_value,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }

    /// Get current value
    pub fn value(&self) -> u64 {
        self.value.load(Ordering::Acquire)
    }

    /// Get metric name
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Summary of a value distribution. Keeps constant memory: only the
/// running aggregates are stored, never the samples.
#[derive(Debug, Clone)]
pub struct Histogram {
    stats: Arc<RwLock<HistogramStats>>,
    name: String,
}

impl Histogram {
    /// Create a new histogram
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            stats: Arc::new(RwLock::new(HistogramStats::default())),
            name: name.into(),
        }
    }

    /// Fold a value into the aggregates
    pub fn record(&self, value: f64) {
        let mut stats = self.stats.write();
        if stats.count == 0 {
            stats.min = value;
            stats.max = value;
        } else {
            stats.min = stats.min.min(value);
            stats.max = stats.max.max(value);
        }
        stats.count += 1;
        stats.sum += value;
        stats.mean = stats.sum / stats.count as f64;
    }

    /// Snapshot of the aggregates
    pub fn stats(&self) -> HistogramStats {
        self.stats.read().clone()
    }

    /// Get metric name
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Statistics computed from histogram values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistogramStats {
    pub count: usize,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Metrics recorded over the lifetime of a transfer engine
#[derive(Debug, Clone)]
pub struct TransferMetrics {
    pub started: Counter,
    pub succeeded: Counter,
    pub failed: Counter,
    pub rollbacks: Counter,
    pub bytes_transferred: Counter,
    /// Transfer durations in milliseconds
    pub duration_ms: Histogram,
}

impl TransferMetrics {
    pub fn new() -> Self {
        Self {
            started: Counter::new("transfers_started"),
            succeeded: Counter::new("transfers_succeeded"),
            failed: Counter::new("transfers_failed"),
            rollbacks: Counter::new("transfer_rollbacks"),
            bytes_transferred: Counter::new("bytes_transferred"),
            duration_ms: Histogram::new("transfer_duration_ms"),
        }
    }
}

impl Default for TransferMetrics {
    fn default() -> Self {
        Self::new()
    }
}

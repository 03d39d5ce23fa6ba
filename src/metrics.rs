//! Aggregate delivery metrics, readable concurrently with worker updates.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Default)]
struct MetricsInner {
    total_sent: u64,
    failed_attempts: u64,
    total_retries: u64,
    // Streaming mean of per-delivery latency: one sample per recorded
    // delivery, bounded memory.
    delivery_samples: u64,
    delivery_time_total: Duration,
}

/// Counters and latency aggregation for the delivery pipeline.
///
/// Guarded by its own readers-writer lock, distinct from the store's. A
/// snapshot is internally consistent per field but is not an atomic
/// cross-field instant relative to concurrent workers.
#[derive(Default)]
pub struct DeliveryMetrics {
    inner: RwLock<MetricsInner>,
}

impl DeliveryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one successful delivery and its observed latency.
    pub fn record_delivery(&self, elapsed: Duration) {
        let mut inner = self.inner.write();
        inner.total_sent += 1;
        inner.delivery_samples += 1;
        inner.delivery_time_total += elapsed;
    }

    pub fn record_failed_attempt(&self) {
        self.inner.write().failed_attempts += 1;
    }

    pub fn record_retry(&self) {
        self.inner.write().total_retries += 1;
    }

    pub fn total_sent(&self) -> u64 {
        self.inner.read().total_sent
    }

    pub fn failed_attempts(&self) -> u64 {
        self.inner.read().failed_attempts
    }

    pub fn total_retries(&self) -> u64 {
        self.inner.read().total_retries
    }

    /// Arithmetic mean of recorded delivery latencies; zero when nothing
    /// has been delivered yet.
    pub fn average_delivery_time(&self) -> Duration {
        let inner = self.inner.read();
        if inner.delivery_samples == 0 {
            return Duration::ZERO;
        }
        inner.delivery_time_total / inner.delivery_samples as u32
    }

    pub fn snapshot(&self, queue_size: usize, worker_count: usize) -> MetricsSnapshot {
        let inner = self.inner.read();
        let avg = if inner.delivery_samples == 0 {
            Duration::ZERO
        } else {
            inner.delivery_time_total / inner.delivery_samples as u32
        };

        MetricsSnapshot {
            total_sent: inner.total_sent,
            failed_attempts: inner.failed_attempts,
            total_retries: inner.total_retries,
            avg_delivery_time: format!("{:?}", avg),
            queue_size,
            worker_count,
        }
    }
}

/// Point-in-time view of the delivery metrics, serialized for the read
/// surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub total_sent: u64,
    pub failed_attempts: u64,
    pub total_retries: u64,
    /// Human-readable mean delivery latency, e.g. "23.4ms"
    pub avg_delivery_time: String,
    pub queue_size: usize,
    pub worker_count: usize,
}

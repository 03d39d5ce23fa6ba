//! Synthetic delivery transport.
//!
//! Actual delivery to devices is modeled as a randomized delay plus a
//! failure coin. Both draws sit behind a trait so the pipeline can be
//! driven deterministically in tests.

use rand::Rng;
use std::time::Duration;

use crate::config::DeliveryConfig;

/// Source of the per-attempt processing delay and failure draw.
pub trait DeliveryTransport: Send + Sync {
    /// Synthetic processing latency for one delivery attempt.
    fn delivery_delay(&self) -> Duration;

    /// Whether this delivery attempt fails.
    fn attempt_fails(&self) -> bool;
}

/// Production transport: uniform delay in `[min, max)` and a fixed
/// failure probability.
pub struct SyntheticTransport {
    failure_rate: f64,
    min_delay: Duration,
    max_delay: Duration,
}

impl SyntheticTransport {
    pub fn new(failure_rate: f64, min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            failure_rate: failure_rate.clamp(0.0, 1.0),
            min_delay,
            max_delay,
        }
    }

    pub fn from_config(config: &DeliveryConfig) -> Self {
        Self::new(
            config.failure_rate,
            Duration::from_millis(config.min_processing_delay_ms),
            Duration::from_millis(config.max_processing_delay_ms),
        )
    }
}

impl DeliveryTransport for SyntheticTransport {
    fn delivery_delay(&self) -> Duration {
        if self.max_delay <= self.min_delay {
            return self.min_delay;
        }
        let mut rng = rand::rng();
        let millis = rng.random_range(self.min_delay.as_millis()..self.max_delay.as_millis());
        Duration::from_millis(millis as u64)
    }

    fn attempt_fails(&self) -> bool {
        if self.failure_rate <= 0.0 {
            return false;
        }
        rand::rng().random_bool(self.failure_rate)
    }
}

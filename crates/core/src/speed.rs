//! Smoothed transfer speed estimate shared across move jobs.

use std::time::Duration;

use tracing::debug;

use crate::metrics::SPEED_ESTIMATE;

/// Default speed estimate before any move has been measured (20 MiB/s).
pub const DEFAULT_SPEED_BPS: f64 = 20.0 * 1024.0 * 1024.0;

/// Default minimum transfer size for a completed job to be sampled (10 MiB).
pub const DEFAULT_MIN_SAMPLE_BYTES: u64 = 10 * 1024 * 1024;

/// Process-lifetime bytes/second estimate.
///
/// Only completed moves larger than `min_sample_bytes` feed the estimate, so
/// tiny renames do not skew it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedEstimator {
    estimate: f64,
    min_sample_bytes: u64,
}

impl Default for SpeedEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_SPEED_BPS, DEFAULT_MIN_SAMPLE_BYTES)
    }
}

impl SpeedEstimator {
    pub fn new(initial_bps: f64, min_sample_bytes: u64) -> Self {
        let estimate = if initial_bps.is_finite() && initial_bps > 0.0 {
            initial_bps
        } else {
            DEFAULT_SPEED_BPS
        };
        SPEED_ESTIMATE.set(estimate);
        Self {
            estimate,
            min_sample_bytes,
        }
    }

    /// Current estimate in bytes per second.
    pub fn estimate(&self) -> f64 {
        self.estimate
    }

    pub fn min_sample_bytes(&self) -> u64 {
        self.min_sample_bytes
    }

    /// Blends an observed speed into the estimate, favouring the observation.
    pub fn update(&mut self, observed_bps: f64) {
        if !observed_bps.is_finite() || observed_bps < 0.0 {
            return;
        }
        self.estimate = (self.estimate * 0.5 + observed_bps * 1.5) / 2.0;
        SPEED_ESTIMATE.set(self.estimate);
    }

    /// Samples a completed transfer.
    ///
    /// Returns `false` when the transfer is too small to be sampled. Elapsed
    /// time below one second counts as one second.
    pub fn record_transfer(&mut self, bytes: u64, elapsed: Duration) -> bool {
        if bytes <= self.min_sample_bytes {
            return false;
        }
        let secs = elapsed.as_secs_f64().max(1.0);
        let observed = bytes as f64 / secs;
        self.update(observed);
        debug!(
            "Speed sample {:.0} B/s from {} bytes in {:.1}s, estimate now {:.0} B/s",
            observed, bytes, secs, self.estimate
        );
        true
    }
}

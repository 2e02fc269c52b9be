//! Scheduler configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::speed::{DEFAULT_MIN_SAMPLE_BYTES, DEFAULT_SPEED_BPS};

/// Configuration for the move scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// How often queued jobs are admitted and progress is refreshed (milliseconds).
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,

    /// Speed estimate used before any move has been measured (bytes/second).
    #[serde(default = "default_speed")]
    pub default_speed_bps: f64,

    /// Completed moves must transfer more than this to update the speed estimate.
    #[serde(default = "default_min_sample")]
    pub min_speed_sample_bytes: u64,
}

fn default_tick_interval() -> u64 {
    2000 // 2 seconds
}

fn default_speed() -> f64 {
    DEFAULT_SPEED_BPS
}

fn default_min_sample() -> u64 {
    DEFAULT_MIN_SAMPLE_BYTES
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            default_speed_bps: default_speed(),
            min_speed_sample_bytes: default_min_sample(),
        }
    }
}

impl SchedulerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn with_tick_interval_ms(mut self, ms: u64) -> Self {
        self.tick_interval_ms = ms;
        self
    }

    pub fn with_default_speed(mut self, bps: f64) -> Self {
        self.default_speed_bps = bps;
        self
    }

    pub fn with_min_speed_sample(mut self, bytes: u64) -> Self {
        self.min_speed_sample_bytes = bytes;
        self
    }
}

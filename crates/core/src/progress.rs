//! Completion estimate for a single move job.
//!
//! The tracker compares the bytes visible under the destination against the
//! job's total size. A destination that already reports exactly the total size
//! is treated as unreliable: filesystems can report the full allocated size
//! before the data has been written. In that case the elapsed time and the
//! shared speed estimate are used instead.
//!
//! The same heuristic misfires for genuinely instant moves (a rename on the
//! same filesystem). Those jobs show an estimated percentage until the mover
//! confirms completion, which is an accepted approximation.

use std::path::PathBuf;
use std::time::Duration;

use tokio::time::Instant;

use crate::size_probe::SizeProbe;

/// Highest percentage a job can report before the mover confirms completion.
pub const MOVING_PERCENT_CEILING: f64 = 99.999_999;

/// Per-job progress state.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total_size: u64,
    dest_paths: Vec<PathBuf>,
    size: u64,
    percent: f64,
    started_at: Option<Instant>,
    finished_at: Option<Instant>,
}

impl ProgressTracker {
    /// Creates an idle tracker for a job of `total_size` bytes.
    pub fn new(total_size: u64, dest_paths: Vec<PathBuf>) -> Self {
        Self {
            total_size,
            dest_paths,
            size: 0,
            percent: 0.0,
            started_at: None,
            finished_at: None,
        }
    }

    /// Arms the tracker. Calling it again has no effect.
    pub fn start(&mut self, now: Instant) {
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
    }

    /// Whether the tracker is armed and not yet stopped.
    pub fn is_active(&self) -> bool {
        self.started_at.is_some() && self.finished_at.is_none()
    }

    /// Probes the destination and recomputes the percentage.
    pub fn update(&mut self, probe: &dyn SizeProbe, speed_bps: f64, now: Instant) {
        let observed = probe.total_size(&self.dest_paths);
        self.observe(observed, speed_bps, now);
    }

    /// Recomputes the percentage from an already probed destination size.
    ///
    /// Ignored unless the tracker is active. The percentage never decreases
    /// and stays below 100 until [`ProgressTracker::finish`].
    pub fn observe(&mut self, observed: u64, speed_bps: f64, now: Instant) {
        if !self.is_active() {
            return;
        }

        let observed = if observed == self.total_size {
            let elapsed = self.elapsed(now).as_secs_f64();
            let estimated = (speed_bps.max(0.0) * elapsed).min(self.total_size as f64);
            estimated as u64
        } else {
            observed.min(self.total_size)
        };

        let percent = (observed as f64 / self.total_size.max(1) as f64 * 100.0)
            .clamp(0.0, MOVING_PERCENT_CEILING);

        if percent >= self.percent {
            self.percent = percent;
            self.size = observed;
        }
    }

    /// Marks the move as complete: full size, exactly 100 percent.
    pub fn finish(&mut self, now: Instant) {
        self.size = self.total_size;
        self.percent = 100.0;
        self.stop(now);
    }

    /// Stops tracking without claiming completion.
    pub fn stop(&mut self, now: Instant) {
        if self.finished_at.is_none() {
            self.finished_at = Some(now);
        }
    }

    /// Time spent moving, frozen once stopped. Zero before start.
    pub fn elapsed(&self, now: Instant) -> Duration {
        match self.started_at {
            Some(started) => self
                .finished_at
                .unwrap_or(now)
                .saturating_duration_since(started),
            None => Duration::ZERO,
        }
    }

    /// Bytes per second over the elapsed time (minimum one second).
    pub fn average_speed(&self, now: Instant) -> f64 {
        self.size as f64 / self.elapsed(now).as_secs_f64().max(1.0)
    }

    pub fn percent(&self) -> f64 {
        self.percent
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn dest_paths(&self) -> &[PathBuf] {
        &self.dest_paths
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    /// Text shown while the job is moving, e.g. `Moving 42.17`.
    pub fn moving_message(&self) -> String {
        format!("Moving {}", format_moving_percent(self.percent))
    }
}

/// Formats a percentage with two decimals without ever showing `100.00`.
pub fn format_moving_percent(percent: f64) -> String {
    let text = format!("{:.2}", percent);
    if percent >= 100.0 || text == "100.00" {
        "99.99".to_string()
    } else {
        text
    }
}

//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Scheduler (submissions, rejections, admissions, terminal results)
//! - Queue depth and the shared speed estimate

use once_cell::sync::Lazy;
use prometheus::{Gauge, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Scheduler - Submission Metrics
// =============================================================================

/// Move requests accepted into the queue.
pub static MOVES_SUBMITTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "movetools_moves_submitted_total",
        "Total move requests accepted into the queue",
    )
    .unwrap()
});

/// Move requests or admissions that were refused, by reason.
pub static MOVES_REJECTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "movetools_moves_rejected_total",
            "Total move requests rejected before a move started",
        ),
        &["reason"], // "validation", "admission", "duplicate"
    )
    .unwrap()
});

// =============================================================================
// Scheduler - Move Metrics
// =============================================================================

/// Moves handed to the mover.
pub static MOVES_STARTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("movetools_moves_started_total", "Total moves started").unwrap()
});

/// Moves reaching a terminal state reported by the mover.
pub static MOVES_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("movetools_moves_finished_total", "Total moves finished"),
        &["result"], // "done", "error"
    )
    .unwrap()
});

/// Time from admission to the mover's completion event.
pub static MOVE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "movetools_move_duration_seconds",
            "Duration of moves from admission to completion",
        )
        .buckets(vec![
            0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 300.0, 900.0, 1800.0, 3600.0,
        ]),
        &["result"],
    )
    .unwrap()
});

// =============================================================================
// Scheduler - State Metrics
// =============================================================================

/// Jobs waiting for admission.
pub static PENDING_MOVES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("movetools_pending_moves", "Number of queued moves").unwrap()
});

/// Current transfer speed estimate in bytes per second.
pub static SPEED_ESTIMATE: Lazy<Gauge> = Lazy::new(|| {
    Gauge::new(
        "movetools_speed_estimate_bytes_per_second",
        "Smoothed move speed estimate",
    )
    .unwrap()
});

/// Register all core metrics with a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Submissions
        Box::new(MOVES_SUBMITTED.clone()),
        Box::new(MOVES_REJECTED.clone()),
        // Moves
        Box::new(MOVES_STARTED.clone()),
        Box::new(MOVES_FINISHED.clone()),
        Box::new(MOVE_DURATION.clone()),
        // State
        Box::new(PENDING_MOVES.clone()),
        Box::new(SPEED_ESTIMATE.clone()),
    ]
}

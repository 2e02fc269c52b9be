//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the movetools server:
//! - HTTP request metrics (latency, counts, in flight)
//! - Move service state (collected dynamically)
//! - Move lifecycle counters registered from the core

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use regex_lite::Regex;
use tracing::warn;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "movetools_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("movetools_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "movetools_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Service Metrics (collected dynamically)
// =============================================================================

/// Move service running state (1 = running, 0 = stopped).
pub static SERVICE_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "movetools_service_running",
        "Whether the move service is running (1) or stopped (0)",
    )
    .unwrap()
});

/// Job records currently kept, in any status.
pub static JOB_RECORDS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("movetools_job_records", "Number of kept move job records").unwrap()
});

/// Torrents registered for "move completed".
pub static TORRENTS_REGISTERED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "movetools_torrents_registered",
        "Number of torrents known to the server",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Service
    registry
        .register(Box::new(SERVICE_RUNNING.clone()))
        .unwrap();
    registry.register(Box::new(JOB_RECORDS.clone())).unwrap();
    registry
        .register(Box::new(TORRENTS_REGISTERED.clone()))
        .unwrap();

    // Core move lifecycle metrics
    for metric in movetools_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so the gauges reflect the service right now.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let status = state.service().status().await;
    SERVICE_RUNNING.set(if status.running { 1 } else { 0 });
    JOB_RECORDS.set(status.jobs as i64);
    TORRENTS_REGISTERED.set(state.registry().len() as i64);
}

static HASH_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9a-fA-F]{40}").unwrap());

/// Normalize a path for metric labels (replace info hashes with a placeholder).
pub fn normalize_path(path: &str) -> String {
    HASH_REGEX.replace_all(path, "{hash}").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_hash() {
        let path = "/api/v1/moves/a94a8fe5ccb19ba61c4c0873d391e987982fbbd3";
        assert_eq!(normalize_path(path), "/api/v1/moves/{hash}");
    }

    #[test]
    fn test_normalize_path_torrent_hash() {
        let path = "/api/v1/torrents/A94A8FE5CCB19BA61C4C0873D391E987982FBBD3";
        assert_eq!(normalize_path(path), "/api/v1/torrents/{hash}");
    }

    #[test]
    fn test_normalize_path_no_ids() {
        let path = "/api/v1/moves/status";
        assert_eq!(normalize_path(path), "/api/v1/moves/status");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        // Access metrics to ensure they're initialized
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("movetools_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_all_metrics() {
        // Vec metrics only appear once a label set has been touched
        HTTP_REQUEST_DURATION
            .with_label_values(&["GET", "/test", "200"])
            .observe(0.1);
        HTTP_REQUESTS_IN_FLIGHT.set(0);
        SERVICE_RUNNING.set(0);
        movetools_core::metrics::MOVES_FINISHED
            .with_label_values(&["done"])
            .inc_by(0);

        let output = encode_metrics();

        assert!(output.contains("movetools_http_request_duration_seconds"));
        assert!(output.contains("movetools_http_requests_in_flight"));
        assert!(output.contains("movetools_service_running"));
        assert!(output.contains("movetools_job_records"));
        assert!(output.contains("movetools_torrents_registered"));
        assert!(output.contains("movetools_moves_finished_total"));
        assert!(output.contains("movetools_pending_moves"));
    }
}

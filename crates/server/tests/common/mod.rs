//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with a running move service backed by the mock mover, so requests can be
//! driven without touching real storage.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use movetools_core::{
    testing::{MockMover, StaticSizeProbe},
    Collaborators, Config, JobStatus, MemorySettingsStore, MoveService, SchedulerConfig,
    TorrentRegistry,
};

/// Re-export fixtures for test convenience
pub use movetools_core::testing::fixtures;

/// Test fixture for API testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_submit() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.post("/api/v1/moves", json!({
///         "key": "abc",
///         "source_path": "/src",
///         "dest_path": "/dst"
///     })).await;
///
///     assert_eq!(response.status, 202);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock mover - report success or failure of admitted moves
    pub mover: MockMover,
    /// Scripted sizes for source and destination paths
    pub probe: StaticSizeProbe,
    pub service: Arc<MoveService>,
    pub registry: Arc<TorrentRegistry>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a fixture with a running service ticking every 10ms.
    pub async fn new() -> Self {
        let (mover, events) = MockMover::new();
        let probe = StaticSizeProbe::new();
        let registry = Arc::new(TorrentRegistry::new());

        let mut config = Config::default();
        config.scheduler = SchedulerConfig::default().with_tick_interval_ms(10);

        let service = Arc::new(MoveService::new(
            config.scheduler.clone(),
            Collaborators {
                mover: Arc::new(mover.clone()),
                events,
                enumerator: registry.clone(),
                settings: Arc::new(MemorySettingsStore::default()),
                probe: Arc::new(probe.clone()),
            },
        ));
        service.start().await;

        let state = Arc::new(movetools_server::state::AppState::new(
            config,
            Arc::clone(&service),
            Arc::clone(&registry),
        ));
        let router = movetools_server::api::create_router(state);

        Self {
            router,
            mover,
            probe,
            service,
            registry,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a PUT request with JSON body.
    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a GET request and return the raw body text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder().uri(path).body(Body::empty()).unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Poll the API until `key` reports `expected`.
    pub async fn wait_for_status(&self, key: &str, expected: JobStatus, timeout: Duration) -> bool {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if self.service.status_token(key).await == Some(expected) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}

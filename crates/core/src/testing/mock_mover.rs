//! Mock mover for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

use crate::mover::{event_channel, MoveRequest, Mover, MoverError, MoverEvent};

/// Mock implementation of the Mover trait.
///
/// Provides controllable behavior for testing:
/// - Track admitted move requests for assertions
/// - Reject admission for chosen keys or for the next call
/// - Emit completion events on demand
///
/// # Example
///
/// ```rust,ignore
/// use movetools_core::testing::MockMover;
///
/// let (mover, events) = MockMover::new();
/// mover.reject_key("abc").await;
///
/// // ... hand `mover` and `events` to the service, submit, tick ...
///
/// mover.succeed("def").await;
/// ```
#[derive(Debug, Clone)]
pub struct MockMover {
    /// Requests that were accepted.
    requests: Arc<RwLock<Vec<MoveRequest>>>,
    /// Keys whose admission is refused.
    rejected_keys: Arc<RwLock<HashSet<String>>>,
    /// If set, the next start_move call fails with this error.
    next_error: Arc<RwLock<Option<MoverError>>>,
    events_tx: mpsc::Sender<MoverEvent>,
}

impl MockMover {
    /// Create a mock mover and the receiver of its events.
    pub fn new() -> (Self, mpsc::Receiver<MoverEvent>) {
        let (events_tx, events_rx) = event_channel();
        let mover = Self {
            requests: Arc::new(RwLock::new(Vec::new())),
            rejected_keys: Arc::new(RwLock::new(HashSet::new())),
            next_error: Arc::new(RwLock::new(None)),
            events_tx,
        };
        (mover, events_rx)
    }

    /// Refuse admission of every request for `key`.
    pub async fn reject_key(&self, key: &str) {
        self.rejected_keys.write().await.insert(key.to_string());
    }

    /// Configure the next start_move call to fail with the given error.
    pub async fn set_next_error(&self, error: MoverError) {
        *self.next_error.write().await = Some(error);
    }

    /// Get all accepted requests, in admission order.
    pub async fn requests(&self) -> Vec<MoveRequest> {
        self.requests.read().await.clone()
    }

    /// Get the number of accepted requests.
    pub async fn request_count(&self) -> usize {
        self.requests.read().await.len()
    }

    /// Report a successful move of `key`.
    pub async fn succeed(&self, key: &str) {
        let _ = self
            .events_tx
            .send(MoverEvent::Succeeded {
                key: key.to_string(),
            })
            .await;
    }

    /// Report a failed move of `key` with a raw mover message.
    pub async fn fail(&self, key: &str, message: &str) {
        let _ = self
            .events_tx
            .send(MoverEvent::Failed {
                key: key.to_string(),
                message: message.to_string(),
            })
            .await;
    }
}

#[async_trait]
impl Mover for MockMover {
    fn name(&self) -> &str {
        "mock"
    }

    async fn start_move(&self, request: MoveRequest) -> Result<(), MoverError> {
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        if self.rejected_keys.read().await.contains(&request.key) {
            return Err(MoverError::Rejected {
                reason: format!("{} rejected by mock", request.key),
            });
        }

        self.requests.write().await.push(request);
        Ok(())
    }
}

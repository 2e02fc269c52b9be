//! Trait definitions for the mover module.

use async_trait::async_trait;

use super::error::MoverError;
use super::types::MoveRequest;

/// Capability to relocate a job's files.
#[async_trait]
pub trait Mover: Send + Sync {
    /// Returns the name of this mover implementation.
    fn name(&self) -> &str;

    /// Accepts or rejects a move.
    ///
    /// `Ok(())` only means the move was started. The outcome arrives later as
    /// a [`super::MoverEvent`] carrying the request's key.
    async fn start_move(&self, request: MoveRequest) -> Result<(), MoverError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct RejectingMover;

    #[async_trait]
    impl Mover for RejectingMover {
        fn name(&self) -> &str {
            "rejecting"
        }

        async fn start_move(&self, request: MoveRequest) -> Result<(), MoverError> {
            Err(MoverError::Rejected {
                reason: format!("{} refused", request.key),
            })
        }
    }

    #[tokio::test]
    async fn test_trait_object_dispatch() {
        let mover: Box<dyn Mover> = Box::new(RejectingMover);
        let result = mover
            .start_move(MoveRequest {
                key: "abc".to_string(),
                source_path: PathBuf::from("/src"),
                dest_path: PathBuf::from("/dst"),
                files: vec![],
            })
            .await;

        assert_eq!(mover.name(), "rejecting");
        assert!(matches!(result, Err(MoverError::Rejected { .. })));
    }
}

//! Types for the move scheduler.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::job::{JobKey, MoveError};
use crate::size_probe::is_contained;

/// A request to move a torrent's files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub key: JobKey,
    /// Paths relative to both `source_path` and `dest_path`.
    #[serde(default)]
    pub files: Vec<PathBuf>,
    pub source_path: PathBuf,
    pub dest_path: PathBuf,
}

impl SubmitRequest {
    pub fn new(
        key: impl Into<JobKey>,
        files: Vec<PathBuf>,
        source_path: impl Into<PathBuf>,
        dest_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            key: key.into(),
            files,
            source_path: source_path.into(),
            dest_path: dest_path.into(),
        }
    }

    /// Source paths of the file entries that stay inside `source_path`.
    pub fn source_files(&self) -> Vec<PathBuf> {
        self.files
            .iter()
            .filter(|file| is_contained(file))
            .map(|file| self.source_path.join(file))
            .collect()
    }
}

/// What happened to a submitted request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Appended to the pending queue.
    Queued,
    /// A queued or moving job already exists for the key; it was left untouched.
    Duplicate,
    /// Recorded as failed without being queued.
    Rejected { error: MoveError },
}

impl SubmitOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmitOutcome::Queued)
    }
}

/// Result of "move completed" for one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedMove {
    pub key: JobKey,
    pub result: CompletedResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CompletedResult {
    Submitted { outcome: SubmitOutcome },
    UnknownTorrent,
    NotFinished,
}

/// Current state of the move service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus {
    /// Whether the tick loop is running.
    pub running: bool,
    /// Key of the job being moved, if any.
    pub active: Option<JobKey>,
    /// Jobs waiting for admission.
    pub pending: usize,
    /// Records currently kept, in any status.
    pub jobs: usize,
    pub speed_estimate_bps: f64,
}

/// Identifies the active job a size probe was taken for.
///
/// A probe result is only applied if the job is still active and was
/// started at the same instant, so a result for a job that finished or was
/// replaced while probing is discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressTarget {
    pub key: JobKey,
    pub dest_paths: Vec<PathBuf>,
    pub started_at: Instant,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(SubmitOutcome::Queued).unwrap();
        assert_eq!(json["outcome"], "queued");

        let json = serde_json::to_value(SubmitOutcome::Rejected {
            error: MoveError::same_path(),
        })
        .unwrap();
        assert_eq!(json["outcome"], "rejected");
        assert_eq!(json["error"]["reason"], "Same path");
    }

    #[test]
    fn test_completed_result_serialization() {
        let completed = CompletedMove {
            key: "abc".to_string(),
            result: CompletedResult::NotFinished,
        };
        let json = serde_json::to_value(&completed).unwrap();
        assert_eq!(json["key"], "abc");
        assert_eq!(json["result"]["status"], "not_finished");
    }

    #[test]
    fn test_submit_request_files_default() {
        let request: SubmitRequest =
            serde_json::from_str(r#"{"key":"a","source_path":"/src","dest_path":"/dst"}"#)
                .unwrap();
        assert!(request.files.is_empty());
        assert_eq!(request, SubmitRequest::new("a", vec![], "/src", "/dst"));
    }

    #[test]
    fn test_is_accepted() {
        assert!(SubmitOutcome::Queued.is_accepted());
        assert!(!SubmitOutcome::Duplicate.is_accepted());
    }
}

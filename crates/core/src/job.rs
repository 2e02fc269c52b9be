//! Move job records and their status state machine.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;

use crate::progress::ProgressTracker;
use crate::size_probe::resolve_paths;

/// Opaque job identity, usually a torrent's info hash.
pub type JobKey = String;

/// Status of a move job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    /// Waiting in the pending queue.
    Queued,
    /// Handed to the mover, waiting for its completion event.
    Moving,
    /// Mover confirmed the relocation.
    Done,
    /// Validation, admission or the move itself failed.
    Error,
}

impl JobStatus {
    /// Short status token for presentation layers.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "Queued",
            JobStatus::Moving => "Moving",
            JobStatus::Done => "Done",
            JobStatus::Error => "Error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a job ended in [`JobStatus::Error`].
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum MoveError {
    /// Empty or identical source/destination, or a file entry escaping its
    /// directory. Rejected before admission.
    #[error("{0}")]
    Validation(String),

    /// The mover refused the job synchronously.
    #[error("{0}")]
    Admission(String),

    /// The mover reported an asynchronous failure.
    #[error("{0}")]
    External(String),
}

impl MoveError {
    pub fn same_path() -> Self {
        Self::Validation("Same path".to_string())
    }

    pub fn empty_path() -> Self {
        Self::Validation("Empty path".to_string())
    }

    pub fn unsafe_path() -> Self {
        Self::Validation("Unsafe path".to_string())
    }

    pub fn general_failure() -> Self {
        Self::Admission("General failure".to_string())
    }

    /// Builds an external failure from a raw mover message.
    ///
    /// Movers prefix their messages with an identifier followed by colons;
    /// only the text after the last colon is kept.
    pub fn from_mover_message(message: &str) -> Self {
        Self::External(extract_reason(message))
    }

    /// Human readable reason shown in the job's message.
    pub fn reason(&self) -> &str {
        match self {
            Self::Validation(r) | Self::Admission(r) | Self::External(r) => r,
        }
    }

    /// Label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Admission(_) => "admission",
            Self::External(_) => "external",
        }
    }
}

/// Returns the trimmed text after the last `:` of a mover message.
pub fn extract_reason(message: &str) -> String {
    let reason = message.rsplit(':').next().unwrap_or(message).trim();
    if reason.is_empty() {
        "Unknown error".to_string()
    } else {
        reason.to_string()
    }
}

/// One requested relocation of a torrent's files.
#[derive(Debug, Clone)]
pub struct JobRecord {
    key: JobKey,
    source_path: PathBuf,
    dest_path: PathBuf,
    files: Vec<PathBuf>,
    total_size: u64,
    status: JobStatus,
    message: String,
    error: Option<MoveError>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    progress: ProgressTracker,
}

impl JobRecord {
    /// Creates a queued record. `files` are relative to both paths.
    pub fn new(
        key: impl Into<JobKey>,
        files: Vec<PathBuf>,
        source_path: PathBuf,
        dest_path: PathBuf,
        total_size: u64,
    ) -> Self {
        let progress = ProgressTracker::new(total_size, resolve_paths(&dest_path, &files));
        Self {
            key: key.into(),
            source_path,
            dest_path,
            files,
            total_size,
            status: JobStatus::Queued,
            message: JobStatus::Queued.as_str().to_string(),
            error: None,
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
            progress,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn source_path(&self) -> &PathBuf {
        &self.source_path
    }

    pub fn dest_path(&self) -> &PathBuf {
        &self.dest_path
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Human readable status line.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn error(&self) -> Option<&MoveError> {
        self.error.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    pub(crate) fn progress_mut(&mut self) -> &mut ProgressTracker {
        &mut self.progress
    }

    /// `Queued -> Moving`. Returns false for any other starting status.
    pub(crate) fn start(&mut self, now: Instant) -> bool {
        if self.status != JobStatus::Queued {
            return false;
        }
        self.status = JobStatus::Moving;
        self.started_at = Some(Utc::now());
        self.progress.start(now);
        self.refresh_message();
        true
    }

    /// `Moving -> Done`. Returns false for any other starting status.
    pub(crate) fn complete(&mut self, now: Instant) -> bool {
        if self.status != JobStatus::Moving {
            return false;
        }
        self.status = JobStatus::Done;
        self.ended_at = Some(Utc::now());
        self.progress.finish(now);
        self.refresh_message();
        true
    }

    /// `Queued | Moving -> Error`. Returns false for terminal records.
    pub(crate) fn fail(&mut self, error: MoveError, now: Instant) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = JobStatus::Error;
        self.ended_at = Some(Utc::now());
        self.progress.stop(now);
        self.error = Some(error);
        self.refresh_message();
        true
    }

    /// Rebuilds the status line from the current status and progress.
    pub(crate) fn refresh_message(&mut self) {
        self.message = match self.status {
            JobStatus::Queued => JobStatus::Queued.as_str().to_string(),
            JobStatus::Moving => self.progress.moving_message(),
            JobStatus::Done => JobStatus::Done.as_str().to_string(),
            JobStatus::Error => match &self.error {
                Some(error) => format!("Error: {}", error.reason()),
                None => JobStatus::Error.as_str().to_string(),
            },
        };
    }

    /// Serializable view of the record.
    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            key: self.key.clone(),
            status: self.status,
            message: self.message.clone(),
            error: self.error.clone(),
            source_path: self.source_path.clone(),
            dest_path: self.dest_path.clone(),
            files: self.files.clone(),
            total_size: self.total_size,
            moved_size: self.progress.size(),
            percent: self.progress.percent(),
            created_at: self.created_at,
            started_at: self.started_at,
            ended_at: self.ended_at,
        }
    }
}

/// Point-in-time view of a job for presentation layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub key: JobKey,
    pub status: JobStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<MoveError>,
    pub source_path: PathBuf,
    pub dest_path: PathBuf,
    pub files: Vec<PathBuf>,
    pub total_size: u64,
    pub moved_size: u64,
    pub percent: f64,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

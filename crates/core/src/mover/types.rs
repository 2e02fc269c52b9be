//! Request and event types exchanged with a mover.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::job::JobKey;

/// Capacity of the channel created by [`event_channel`].
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// One relocation handed to a mover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub key: JobKey,
    pub source_path: PathBuf,
    pub dest_path: PathBuf,
    /// Paths relative to both `source_path` and `dest_path`.
    pub files: Vec<PathBuf>,
}

/// Asynchronous outcome of an accepted move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MoverEvent {
    Succeeded { key: JobKey },
    /// `message` is the mover's raw text, usually `"<key>: <context>: <reason>"`.
    Failed { key: JobKey, message: String },
}

impl MoverEvent {
    pub fn key(&self) -> &str {
        match self {
            MoverEvent::Succeeded { key } | MoverEvent::Failed { key, .. } => key,
        }
    }
}

/// Creates the channel a mover reports its events on.
pub fn event_channel() -> (mpsc::Sender<MoverEvent>, mpsc::Receiver<MoverEvent>) {
    mpsc::channel(EVENT_CHANNEL_CAPACITY)
}

//! Torrent file enumeration.
//!
//! The scheduler captures a torrent's save path and file list once, when a move
//! is submitted. [`TorrentRegistry`] is the in-memory source of those
//! snapshots; a torrent client integration would implement
//! [`FileEnumerator`] directly instead.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::job::JobKey;

/// What the scheduler needs to know about a torrent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentSnapshot {
    pub key: JobKey,
    /// Directory the files currently live under.
    pub save_path: PathBuf,
    /// Ordered paths relative to `save_path`.
    pub files: Vec<PathBuf>,
    /// Whether the download has completed.
    #[serde(default)]
    pub finished: bool,
    /// Destination used by "move completed".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub move_completed_path: Option<PathBuf>,
}

/// Looks up torrents by key.
pub trait FileEnumerator: Send + Sync {
    /// Returns the torrent's current save path and files, if it is known.
    fn snapshot(&self, key: &str) -> Option<TorrentSnapshot>;
}

/// In-memory [`FileEnumerator`].
#[derive(Debug, Default)]
pub struct TorrentRegistry {
    torrents: RwLock<BTreeMap<JobKey, TorrentSnapshot>>,
}

impl TorrentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a torrent. Returns the previous snapshot.
    pub fn register(&self, torrent: TorrentSnapshot) -> Option<TorrentSnapshot> {
        debug!("Registering torrent {}", torrent.key);
        self.torrents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(torrent.key.clone(), torrent)
    }

    pub fn remove(&self, key: &str) -> Option<TorrentSnapshot> {
        self.torrents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }

    pub fn get(&self, key: &str) -> Option<TorrentSnapshot> {
        self.torrents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// All torrents ordered by key.
    pub fn list(&self) -> Vec<TorrentSnapshot> {
        self.torrents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.torrents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FileEnumerator for TorrentRegistry {
    fn snapshot(&self, key: &str) -> Option<TorrentSnapshot> {
        self.get(key)
    }
}

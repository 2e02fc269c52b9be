//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the collaborator traits,
//! allowing the scheduler and the HTTP surface to be tested without touching
//! real torrents.
//!
//! # Example
//!
//! ```rust,ignore
//! use movetools_core::testing::{fixtures, MockMover, StaticSizeProbe};
//!
//! let (mover, events) = MockMover::new();
//! let probe = StaticSizeProbe::new();
//! probe.set_size("/src/a.bin", 1000);
//!
//! // Hand them to a MoveService...
//! ```

mod mock_mover;
mod mock_probe;

pub use mock_mover::MockMover;
pub use mock_probe::StaticSizeProbe;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::{Path, PathBuf};

    use crate::torrents::TorrentSnapshot;

    /// Relative file list from string slices.
    pub fn files(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    /// A 40 character hex key, like a torrent info hash.
    pub fn info_hash(seed: u8) -> String {
        format!("{:02x}", seed).repeat(20)
    }

    /// A finished torrent with a completed-move destination.
    pub fn finished_torrent(key: &str, save_path: &str, dest: &str, names: &[&str]) -> TorrentSnapshot {
        TorrentSnapshot {
            key: key.to_string(),
            save_path: PathBuf::from(save_path),
            files: files(names),
            finished: true,
            move_completed_path: Some(PathBuf::from(dest)),
        }
    }

    /// Write `bytes` zero bytes at `root/name`, creating parent directories.
    pub fn write_payload(root: &Path, name: &str, bytes: usize) -> PathBuf {
        let path = root.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create payload directory");
        }
        std::fs::write(&path, vec![0u8; bytes]).expect("write payload");
        path
    }
}

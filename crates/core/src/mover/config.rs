//! Configuration for the filesystem mover.

use serde::{Deserialize, Serialize};

/// Configuration for [`super::FsMover`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoverConfig {
    /// Try `rename` before falling back to copy + remove.
    #[serde(default = "default_true")]
    pub prefer_atomic_moves: bool,

    /// Buffer size for cross-filesystem copies in bytes.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Replace files already present at the destination.
    #[serde(default)]
    pub overwrite: bool,
}

fn default_true() -> bool {
    true
}

fn default_buffer_size() -> usize {
    8 * 1024 * 1024 // 8 MB
}

impl Default for MoverConfig {
    fn default() -> Self {
        Self {
            prefer_atomic_moves: true,
            buffer_size: default_buffer_size(),
            overwrite: false,
        }
    }
}

impl MoverConfig {
    pub fn with_atomic_moves(mut self, enabled: bool) -> Self {
        self.prefer_atomic_moves = enabled;
        self
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    pub fn with_overwrite(mut self, enabled: bool) -> Self {
        self.overwrite = enabled;
        self
    }
}

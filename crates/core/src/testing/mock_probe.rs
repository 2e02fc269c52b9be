//! Scripted size probe for testing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use crate::size_probe::SizeProbe;

/// Size probe answering from a table of per-path sizes.
///
/// Paths without an entry count as zero, like missing files.
#[derive(Debug, Clone, Default)]
pub struct StaticSizeProbe {
    sizes: Arc<RwLock<HashMap<PathBuf, u64>>>,
}

impl StaticSizeProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the size reported for `path`.
    pub fn set_size(&self, path: impl AsRef<Path>, bytes: u64) {
        self.sizes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.as_ref().to_path_buf(), bytes);
    }

    /// Forget `path`, so it reads as missing.
    pub fn remove(&self, path: impl AsRef<Path>) {
        self.sizes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path.as_ref());
    }
}

impl SizeProbe for StaticSizeProbe {
    fn total_size(&self, paths: &[PathBuf]) -> u64 {
        let sizes = self.sizes.read().unwrap_or_else(PoisonError::into_inner);
        paths
            .iter()
            .filter_map(|path| sizes.get(path))
            .fold(0u64, |acc, size| acc.saturating_add(*size))
    }
}

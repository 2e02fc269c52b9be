//! Aggregate size probing for sets of files.
//!
//! Size probing is a blocking `stat` per file. Files that are missing or
//! unreadable contribute zero bytes: a move in flight constantly changes what
//! exists on both sides, and partial visibility must never abort a progress
//! computation.

use std::path::{Component, Path, PathBuf};

use tracing::trace;

/// Reads the current aggregate byte size of a set of file paths.
pub trait SizeProbe: Send + Sync {
    /// Returns the summed size of every path that currently exists as a file.
    fn total_size(&self, paths: &[PathBuf]) -> u64;
}

/// Size probe backed by `std::fs::metadata`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSizeProbe;

impl FsSizeProbe {
    pub fn new() -> Self {
        Self
    }
}

impl SizeProbe for FsSizeProbe {
    fn total_size(&self, paths: &[PathBuf]) -> u64 {
        paths
            .iter()
            .fold(0u64, |acc, path| acc.saturating_add(file_size(path)))
    }
}

fn file_size(path: &Path) -> u64 {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => meta.len(),
        Ok(_) => 0,
        Err(e) => {
            trace!("Size probe skipped {}: {}", path.display(), e);
            0
        }
    }
}

/// True when `file` is a non-empty relative path made only of normal
/// components, so joining it onto a base directory stays inside that base.
pub fn is_contained(file: &Path) -> bool {
    !file.as_os_str().is_empty()
        && file
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
}

/// Joins relative file paths onto a root directory, preserving order.
pub fn resolve_paths(root: &Path, files: &[PathBuf]) -> Vec<PathBuf> {
    files.iter().map(|file| root.join(file)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_contained_paths() {
        assert!(is_contained(Path::new("a.bin")));
        assert!(is_contained(Path::new("Show: S01/e01.mkv")));
        assert!(is_contained(Path::new("show/./e01.mkv")));

        assert!(!is_contained(Path::new("")));
        assert!(!is_contained(Path::new("../secret.txt")));
        assert!(!is_contained(Path::new("show/../../secret.txt")));
        assert!(!is_contained(Path::new("/etc/passwd")));
    }

    #[test]
    fn test_sums_existing_files() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.bin"), vec![0u8; 300]).unwrap();
        std::fs::create_dir_all(temp.path().join("sub")).unwrap();
        std::fs::write(temp.path().join("sub/b.bin"), vec![0u8; 700]).unwrap();

        let paths = resolve_paths(
            temp.path(),
            &[PathBuf::from("a.bin"), PathBuf::from("sub/b.bin")],
        );

        assert_eq!(FsSizeProbe::new().total_size(&paths), 1000);
    }

    #[test]
    fn test_missing_files_count_as_zero() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("present.bin"), vec![0u8; 42]).unwrap();

        let paths = resolve_paths(
            temp.path(),
            &[PathBuf::from("present.bin"), PathBuf::from("gone.bin")],
        );

        assert_eq!(FsSizeProbe::new().total_size(&paths), 42);
    }

    #[test]
    fn test_directories_count_as_zero() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("folder")).unwrap();

        let paths = vec![temp.path().join("folder")];
        assert_eq!(FsSizeProbe::new().total_size(&paths), 0);
    }

    #[test]
    fn test_empty_path_list() {
        assert_eq!(FsSizeProbe::new().total_size(&[]), 0);
    }

    #[test]
    fn test_resolve_paths_keeps_order() {
        let root = Path::new("/data/torrents");
        let resolved = resolve_paths(
            root,
            &[PathBuf::from("b.mkv"), PathBuf::from("a/extra.nfo")],
        );
        assert_eq!(
            resolved,
            vec![
                PathBuf::from("/data/torrents/b.mkv"),
                PathBuf::from("/data/torrents/a/extra.nfo"),
            ]
        );
    }
}

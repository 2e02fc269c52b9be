//! Removal of source directories left empty by a move.

use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::size_probe::is_contained;

/// Removes `root`, the directories that held `files`, and their ancestors
/// while they are empty.
///
/// Directories are visited deepest first and each walk stops at the first
/// directory that cannot be removed. Failures are expected (non-empty or
/// protected directories) and never reported. Entries that are absolute or
/// climb out of `root` are skipped. Returns how many directories were removed.
pub fn remove_empty_dirs(root: &Path, files: &[PathBuf]) -> usize {
    let mut dirs: BTreeSet<PathBuf> = files
        .iter()
        .filter(|file| is_contained(file))
        .filter_map(|file| root.join(file).parent().map(Path::to_path_buf))
        .collect();
    dirs.insert(root.to_path_buf());

    let mut ordered: Vec<PathBuf> = dirs.into_iter().collect();
    ordered.sort_by_key(|dir| Reverse(dir.components().count()));

    let mut removed = 0;
    for dir in &ordered {
        let mut current = Some(dir.as_path());
        while let Some(path) = current {
            if path.as_os_str().is_empty() {
                break;
            }
            match std::fs::remove_dir(path) {
                Ok(()) => {
                    debug!("Removed empty directory {}", path.display());
                    removed += 1;
                    current = path.parent();
                }
                Err(e) => {
                    trace!("Kept directory {}: {}", path.display(), e);
                    break;
                }
            }
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_removes_nested_empty_directories() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("downloads/torrent");
        std::fs::create_dir_all(root.join("season/extras")).unwrap();
        // Keeps the walk from climbing into the temp dir itself
        std::fs::write(temp.path().join("downloads/keep.txt"), "x").unwrap();

        let removed = remove_empty_dirs(
            &root,
            &[
                PathBuf::from("season/extras/a.nfo"),
                PathBuf::from("season/b.mkv"),
            ],
        );

        assert_eq!(removed, 3);
        assert!(!root.exists());
        assert!(temp.path().join("downloads").exists());
    }

    #[test]
    fn test_non_empty_directories_are_kept() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("torrent");
        std::fs::create_dir_all(root.join("sub")).unwrap();
        std::fs::write(root.join("left-behind.txt"), "x").unwrap();

        let removed = remove_empty_dirs(&root, &[PathBuf::from("sub/a.mkv")]);

        assert_eq!(removed, 1);
        assert!(!root.join("sub").exists());
        assert!(root.exists());
    }

    #[test]
    fn test_escaping_entries_are_skipped() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("library/torrent");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("keep.txt"), "x").unwrap();
        let outside = temp.path().join("outside/empty");
        std::fs::create_dir_all(&outside).unwrap();

        let removed = remove_empty_dirs(
            &root,
            &[
                PathBuf::from("../../outside/empty/a.mkv"),
                outside.join("b.mkv"),
            ],
        );

        assert_eq!(removed, 0);
        assert!(outside.exists());
    }

    #[test]
    fn test_missing_directories_are_ignored() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("never-created");
        assert_eq!(remove_empty_dirs(&root, &[PathBuf::from("a/b.mkv")]), 0);
    }
}

//! Filesystem mover implementation.

use std::path::Path;
use std::time::Instant;

use async_trait::async_trait;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::config::MoverConfig;
use super::error::MoverError;
use super::traits::Mover;
use super::types::{MoveRequest, MoverEvent};
use crate::size_probe::is_contained;

/// Moves files on the local filesystem in a background task.
pub struct FsMover {
    config: MoverConfig,
    events_tx: mpsc::Sender<MoverEvent>,
}

impl FsMover {
    pub fn new(config: MoverConfig, events_tx: mpsc::Sender<MoverEvent>) -> Self {
        Self { config, events_tx }
    }

    pub fn with_defaults(events_tx: mpsc::Sender<MoverEvent>) -> Self {
        Self::new(MoverConfig::default(), events_tx)
    }

    /// Attempts a rename. `Ok(false)` means the paths are on different devices.
    async fn try_atomic_move(source: &Path, destination: &Path) -> Result<bool, std::io::Error> {
        match fs::rename(source, destination).await {
            Ok(()) => Ok(true),
            Err(e) => {
                // EXDEV is 18 on Linux
                if e.kind() == std::io::ErrorKind::CrossesDevices || e.raw_os_error() == Some(18) {
                    Ok(false)
                } else {
                    Err(e)
                }
            }
        }
    }

    async fn copy_file(
        config: &MoverConfig,
        source: &Path,
        destination: &Path,
    ) -> Result<u64, MoverError> {
        let copy_err =
            |e| MoverError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e);

        let source_file = File::open(source).await.map_err(copy_err)?;
        let dest_file = File::create(destination).await.map_err(copy_err)?;

        let mut reader = BufReader::with_capacity(config.buffer_size, source_file);
        let mut writer = BufWriter::with_capacity(config.buffer_size, dest_file);
        let mut buffer = vec![0u8; config.buffer_size];
        let mut total_bytes = 0u64;

        loop {
            let bytes_read = reader.read(&mut buffer).await.map_err(copy_err)?;
            if bytes_read == 0 {
                break;
            }
            writer
                .write_all(&buffer[..bytes_read])
                .await
                .map_err(copy_err)?;
            total_bytes += bytes_read as u64;
        }

        writer.flush().await.map_err(copy_err)?;
        Ok(total_bytes)
    }

    async fn ensure_parent_dirs(path: &Path) -> Result<(), MoverError> {
        if let Some(parent) = path.parent() {
            if !fs::try_exists(parent).await.unwrap_or(false) {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| MoverError::DirectoryCreationFailed {
                        path: parent.to_path_buf(),
                        source: e,
                    })?;
            }
        }
        Ok(())
    }

    /// Moves one file. Returns `false` when the source file is absent.
    async fn move_file(
        config: &MoverConfig,
        source: &Path,
        destination: &Path,
    ) -> Result<bool, MoverError> {
        if !fs::try_exists(source).await.unwrap_or(false) {
            debug!("Skipping missing source file {}", source.display());
            return Ok(false);
        }

        if !config.overwrite && fs::try_exists(destination).await.unwrap_or(false) {
            return Err(MoverError::DestinationExists {
                path: destination.to_path_buf(),
            });
        }

        Self::ensure_parent_dirs(destination).await?;

        if config.prefer_atomic_moves {
            let renamed = Self::try_atomic_move(source, destination)
                .await
                .map_err(|e| {
                    MoverError::move_failed(source.to_path_buf(), destination.to_path_buf(), e)
                })?;
            if renamed {
                return Ok(true);
            }
        }

        Self::copy_file(config, source, destination).await?;
        fs::remove_file(source).await.map_err(|e| {
            MoverError::move_failed(source.to_path_buf(), destination.to_path_buf(), e)
        })?;
        Ok(true)
    }

    /// Moves every file of the request, stopping at the first failure.
    async fn relocate(config: &MoverConfig, request: &MoveRequest) -> Result<usize, MoverError> {
        let mut moved = 0;
        for file in &request.files {
            let source = request.source_path.join(file);
            let destination = request.dest_path.join(file);
            if Self::move_file(config, &source, &destination).await? {
                moved += 1;
            }
        }
        Ok(moved)
    }

    async fn validate(request: &MoveRequest) -> Result<(), MoverError> {
        if request.dest_path.as_os_str().is_empty() {
            return Err(MoverError::InvalidDestination {
                path: request.dest_path.clone(),
            });
        }
        if let Some(file) = request.files.iter().find(|file| !is_contained(file)) {
            return Err(MoverError::UnsafePath { path: file.clone() });
        }
        match fs::metadata(&request.source_path).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            _ => Err(MoverError::SourceNotFound {
                path: request.source_path.clone(),
            }),
        }
    }
}

#[async_trait]
impl Mover for FsMover {
    fn name(&self) -> &str {
        "fs"
    }

    async fn start_move(&self, request: MoveRequest) -> Result<(), MoverError> {
        if self.events_tx.is_closed() {
            return Err(MoverError::ShutDown);
        }
        Self::validate(&request).await?;

        let config = self.config.clone();
        let events_tx = self.events_tx.clone();

        tokio::spawn(async move {
            let start = Instant::now();
            let event = match Self::relocate(&config, &request).await {
                Ok(moved) => {
                    info!(
                        "Moved {} file(s) of {} to {} in {:?}",
                        moved,
                        request.key,
                        request.dest_path.display(),
                        start.elapsed()
                    );
                    MoverEvent::Succeeded {
                        key: request.key.clone(),
                    }
                }
                Err(e) => {
                    warn!("Move of {} failed: {}", request.key, e);
                    MoverEvent::Failed {
                        key: request.key.clone(),
                        message: format!(
                            "{}: move storage failed: {}",
                            request.key,
                            e.reason()
                        ),
                    }
                }
            };
            if events_tx.send(event).await.is_err() {
                debug!("Event receiver gone, dropping outcome of {}", request.key);
            }
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use crate::job::extract_reason;
    use crate::mover::event_channel;
    use crate::size_probe::resolve_paths;
    use tempfile::TempDir;
    use tokio_test::{assert_err, assert_ok};

    fn request(temp: &TempDir, files: &[&str]) -> MoveRequest {
        MoveRequest {
            key: "abc".to_string(),
            source_path: temp.path().join("src"),
            dest_path: temp.path().join("dst"),
            files: files.iter().map(PathBuf::from).collect(),
        }
    }

    async fn write(path: PathBuf, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        fs::write(path, content).await.unwrap();
    }

    #[tokio::test]
    async fn test_moves_all_files() {
        let temp = TempDir::new().unwrap();
        write(temp.path().join("src/a.txt"), "alpha").await;
        write(temp.path().join("src/show/b.txt"), "beta").await;

        let (tx, mut rx) = event_channel();
        let mover = FsMover::with_defaults(tx);
        let request = request(&temp, &["a.txt", "show/b.txt"]);

        assert_ok!(mover.start_move(request.clone()).await);
        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            MoverEvent::Succeeded {
                key: "abc".to_string()
            }
        );

        for dest in resolve_paths(&request.dest_path, &request.files) {
            assert!(dest.exists());
        }
        assert!(!temp.path().join("src/a.txt").exists());
        let content = fs::read_to_string(temp.path().join("dst/show/b.txt"))
            .await
            .unwrap();
        assert_eq!(content, "beta");
    }

    #[tokio::test]
    async fn test_copy_fallback_when_atomic_disabled() {
        let temp = TempDir::new().unwrap();
        write(temp.path().join("src/a.txt"), "alpha").await;

        let (tx, mut rx) = event_channel();
        let mover = FsMover::new(
            MoverConfig::default()
                .with_atomic_moves(false)
                .with_buffer_size(2),
            tx,
        );

        assert_ok!(mover.start_move(request(&temp, &["a.txt"])).await);
        assert!(matches!(
            rx.recv().await.unwrap(),
            MoverEvent::Succeeded { .. }
        ));

        let content = fs::read_to_string(temp.path().join("dst/a.txt"))
            .await
            .unwrap();
        assert_eq!(content, "alpha");
        assert!(!temp.path().join("src/a.txt").exists());
    }

    #[tokio::test]
    async fn test_missing_source_files_are_skipped() {
        let temp = TempDir::new().unwrap();
        write(temp.path().join("src/a.txt"), "alpha").await;

        let (tx, mut rx) = event_channel();
        let mover = FsMover::with_defaults(tx);

        assert_ok!(mover.start_move(request(&temp, &["a.txt", "gone.txt"])).await);
        assert!(matches!(
            rx.recv().await.unwrap(),
            MoverEvent::Succeeded { .. }
        ));
        assert!(temp.path().join("dst/a.txt").exists());
        assert!(!temp.path().join("dst/gone.txt").exists());
    }

    #[tokio::test]
    async fn test_missing_source_directory_is_rejected() {
        let temp = TempDir::new().unwrap();
        let (tx, _rx) = event_channel();
        let mover = FsMover::with_defaults(tx);

        let result = mover.start_move(request(&temp, &["a.txt"])).await;
        assert!(matches!(result, Err(MoverError::SourceNotFound { .. })));
    }

    #[tokio::test]
    async fn test_closed_channel_is_rejected() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("src")).await.unwrap();

        let (tx, rx) = event_channel();
        drop(rx);
        let mover = FsMover::with_defaults(tx);

        let result = mover.start_move(request(&temp, &[])).await;
        assert!(matches!(result, Err(MoverError::ShutDown)));
    }

    #[tokio::test]
    async fn test_existing_destination_reports_failure() {
        let temp = TempDir::new().unwrap();
        write(temp.path().join("src/a.txt"), "new").await;
        write(temp.path().join("dst/a.txt"), "old").await;

        let (tx, mut rx) = event_channel();
        let mover = FsMover::with_defaults(tx);

        assert_ok!(mover.start_move(request(&temp, &["a.txt"])).await);
        match rx.recv().await.unwrap() {
            MoverEvent::Failed { key, message } => {
                assert_eq!(key, "abc");
                assert!(message.starts_with("abc: move storage failed: "));
                assert!(message.contains("Destination already exists"));
            }
            other => panic!("unexpected event {:?}", other),
        }

        let content = fs::read_to_string(temp.path().join("dst/a.txt"))
            .await
            .unwrap();
        assert_eq!(content, "old");
    }

    #[tokio::test]
    async fn test_failure_reason_ignores_colons_in_file_names() {
        let temp = TempDir::new().unwrap();
        write(temp.path().join("src/Show: Pilot.mkv"), "new").await;
        write(temp.path().join("dst/Show: Pilot.mkv"), "old").await;

        let (tx, mut rx) = event_channel();
        let mover = FsMover::with_defaults(tx);

        assert_ok!(mover.start_move(request(&temp, &["Show: Pilot.mkv"])).await);
        match rx.recv().await.unwrap() {
            MoverEvent::Failed { message, .. } => {
                assert_eq!(extract_reason(&message), "Destination already exists");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_escaping_file_entries_are_rejected() {
        let temp = TempDir::new().unwrap();
        write(temp.path().join("src/a.txt"), "alpha").await;
        write(temp.path().join("secret.txt"), "secret").await;

        let (tx, _rx) = event_channel();
        let mover = FsMover::with_defaults(tx);

        let result = mover
            .start_move(request(&temp, &["a.txt", "../secret.txt"]))
            .await;
        assert!(matches!(result, Err(MoverError::UnsafePath { .. })));

        let absolute = temp.path().join("secret.txt");
        let result = mover
            .start_move(request(&temp, &[absolute.to_str().unwrap()]))
            .await;
        assert!(matches!(result, Err(MoverError::UnsafePath { .. })));

        assert!(temp.path().join("secret.txt").exists());
        assert!(temp.path().join("src/a.txt").exists());
        assert!(!temp.path().join("dst").exists());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_destination() {
        let temp = TempDir::new().unwrap();
        write(temp.path().join("src/a.txt"), "new").await;
        write(temp.path().join("dst/a.txt"), "old").await;

        let (tx, mut rx) = event_channel();
        let mover = FsMover::new(MoverConfig::default().with_overwrite(true), tx);

        assert_ok!(mover.start_move(request(&temp, &["a.txt"])).await);
        assert!(matches!(
            rx.recv().await.unwrap(),
            MoverEvent::Succeeded { .. }
        ));
        let content = fs::read_to_string(temp.path().join("dst/a.txt"))
            .await
            .unwrap();
        assert_eq!(content, "new");
    }

    #[tokio::test]
    async fn test_empty_destination_is_rejected() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("src")).await.unwrap();
        let (tx, _rx) = event_channel();
        let mover = FsMover::with_defaults(tx);

        let mut req = request(&temp, &[]);
        req.dest_path = PathBuf::new();
        assert_err!(mover.start_move(req).await);
    }
}

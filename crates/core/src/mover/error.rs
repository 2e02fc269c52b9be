//! Error types for the mover module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while admitting or performing a move.
///
/// The display form names the paths involved and is meant for logs. Failure
/// events carry [`MoverError::reason`] instead: the text after the last colon
/// of a failure message ends up in the job's status line, and file names may
/// contain colons.
#[derive(Debug, Error)]
pub enum MoverError {
    /// Source directory does not exist.
    #[error("Source not found {path}")]
    SourceNotFound { path: PathBuf },

    /// Destination path is unusable.
    #[error("Invalid destination {path}")]
    InvalidDestination { path: PathBuf },

    /// The event channel is closed, nobody would observe the outcome.
    #[error("Mover is shut down")]
    ShutDown,

    /// Destination file already exists and overwrite is disabled.
    #[error("Destination already exists {path}")]
    DestinationExists { path: PathBuf },

    /// Failed to create a destination directory.
    #[error("Failed to create directory {path} ({source})")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to rename a file.
    #[error("Failed to move {from} to {to} ({error})")]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Failed to copy a file across filesystems.
    #[error("Failed to copy {from} to {to} ({error})")]
    CopyFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// A file entry is absolute or climbs out of its base directory.
    #[error("Unsafe path {path}")]
    UnsafePath { path: PathBuf },

    /// Rejected for an implementation specific reason.
    #[error("{reason}")]
    Rejected { reason: String },
}

impl MoverError {
    pub fn move_failed(from: PathBuf, to: PathBuf, error: std::io::Error) -> Self {
        Self::MoveFailed { from, to, error }
    }

    pub fn copy_failed(from: PathBuf, to: PathBuf, error: std::io::Error) -> Self {
        Self::CopyFailed { from, to, error }
    }

    /// Short, path-free description used in failure events.
    pub fn reason(&self) -> String {
        let reason = match self {
            Self::SourceNotFound { .. } => "Source not found".to_string(),
            Self::InvalidDestination { .. } => "Invalid destination".to_string(),
            Self::ShutDown => "Mover is shut down".to_string(),
            Self::DestinationExists { .. } => "Destination already exists".to_string(),
            Self::UnsafePath { .. } => "Unsafe path".to_string(),
            Self::DirectoryCreationFailed { source, .. } => source.to_string(),
            Self::MoveFailed { error, .. } | Self::CopyFailed { error, .. } => error.to_string(),
            Self::Rejected { reason } => reason.clone(),
        };
        // Keep the reason a single colon-free segment
        reason.replace(':', " -")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::extract_reason;

    #[test]
    fn test_reason_survives_extraction() {
        let err = MoverError::copy_failed(
            PathBuf::from("/src/a.bin"),
            PathBuf::from("/dst/a.bin"),
            std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        );
        let message = format!("abc: move storage failed: {}", err.reason());
        assert_eq!(extract_reason(&message), "disk full");
        assert!(err.to_string().contains("/dst/a.bin"));
    }

    #[test]
    fn test_reason_ignores_colons_in_paths() {
        let err = MoverError::DestinationExists {
            path: PathBuf::from("/library/Show: Pilot.mkv"),
        };
        let message = format!("abc: move storage failed: {}", err.reason());
        assert_eq!(extract_reason(&message), "Destination already exists");
    }

    #[test]
    fn test_reason_strips_colons_from_io_errors() {
        let err = MoverError::move_failed(
            PathBuf::from("/src/a.bin"),
            PathBuf::from("/dst/a.bin"),
            std::io::Error::new(std::io::ErrorKind::Other, "quota exceeded: user"),
        );
        let message = format!("abc: move storage failed: {}", err.reason());
        assert_eq!(extract_reason(&message), "quota exceeded - user");
    }

    #[test]
    fn test_shut_down_message() {
        assert_eq!(MoverError::ShutDown.to_string(), "Mover is shut down");
    }
}

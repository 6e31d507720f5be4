//! Error types for the filesystem module.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors returned by [`FileSystem`](super::FileSystem) implementations.
#[derive(Debug, Error)]
pub enum FsError {
    /// The path does not exist.
    #[error("File not found: {path}")]
    NotFound { path: PathBuf },

    /// Any other I/O failure.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The path escapes the filesystem root or is otherwise unusable.
    #[error("Invalid path: {path}")]
    InvalidPath { path: PathBuf },

    /// The change-notification backend failed.
    #[error("Watch error: {reason}")]
    Watch { reason: String },
}

impl FsError {
    /// Maps an I/O error, keeping "not found" distinguishable.
    pub fn from_io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Io { path, source }
        }
    }

    /// Creates a new watch error.
    pub fn watch(reason: impl Into<String>) -> Self {
        Self::Watch {
            reason: reason.into(),
        }
    }

    /// Whether this error means the path does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_from_io_not_found() {
        let err = FsError::from_io("/a.jpg", Error::new(ErrorKind::NotFound, "gone"));
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "File not found: /a.jpg");
    }

    #[test]
    fn test_from_io_other() {
        let err = FsError::from_io("/a.jpg", Error::new(ErrorKind::PermissionDenied, "nope"));
        assert!(!err.is_not_found());
        assert!(matches!(err, FsError::Io { .. }));
    }
}

//! Error types for the metadata module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading embedded metadata.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The extractor binary could not be started.
    #[error("exiftool not found at path: {path}")]
    ToolNotFound { path: PathBuf },

    /// The extractor ran but could not read the file.
    #[error("File has no exif data: {reason}")]
    Unreadable { reason: String },

    /// Metadata was read but holds no usable date.
    #[error("Exif data has no known date")]
    NoDate,

    /// The extractor took too long.
    #[error("exiftool timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// I/O error while running the extractor.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MetadataError {
    /// Creates a new unreadable error.
    pub fn unreadable(reason: impl Into<String>) -> Self {
        Self::Unreadable {
            reason: reason.into(),
        }
    }

    /// Whether the failure is about the file rather than the environment.
    pub fn is_file_problem(&self) -> bool {
        matches!(self, Self::Unreadable { .. } | Self::NoDate)
    }
}

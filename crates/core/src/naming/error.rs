//! Error types for the naming module.

use thiserror::Error;

use crate::fs::FsError;

/// Errors that can occur while deriving names.
#[derive(Debug, Error)]
pub enum NamingError {
    /// No date rule matched the file name.
    #[error("Unknown date format")]
    UnknownDateFormat,

    /// A date rule pattern failed to compile.
    #[error("Invalid date pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// The last sequence number for a prefix cannot be incremented.
    #[error("Sequence for {prefix:?} overflowed after {last}")]
    SequenceOverflow { prefix: String, last: u64 },

    /// The next sequence number is already used by an existing file.
    #[error("Sequence {name:?} is already taken")]
    SequenceTaken { name: String },

    /// Listing the target directory failed.
    #[error(transparent)]
    Filesystem(#[from] FsError),
}

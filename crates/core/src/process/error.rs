//! Error types for the process module.

use thiserror::Error;

use crate::fs::FsError;

/// Boxed error carried as the cause of a [`JobError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Outcome of a failed job phase.
///
/// Job errors are logged by the consumer and never surface to the caller
/// of [`Process::kill`](super::Process::kill) or
/// [`Process::wait`](super::Process::wait).
#[derive(Debug, Error)]
pub enum JobError {
    /// The job is not applicable to its file. Expected; logged at info.
    #[error("{cause}")]
    Check { cause: BoxError },

    /// A side effect failed part way through.
    #[error("{stage}: {cause}")]
    Execute {
        stage: String,
        #[source]
        cause: BoxError,
    },

    /// Anything else that went wrong while checking.
    #[error("{0}")]
    Unexpected(BoxError),
}

impl JobError {
    /// Creates a check failure.
    pub fn check(cause: impl Into<BoxError>) -> Self {
        Self::Check {
            cause: cause.into(),
        }
    }

    /// Creates an execute failure labelled with the stage that failed.
    pub fn execute(stage: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        Self::Execute {
            stage: stage.into(),
            cause: cause.into(),
        }
    }

    /// Creates an unexpected error.
    pub fn unexpected(cause: impl Into<BoxError>) -> Self {
        Self::Unexpected(cause.into())
    }

    /// Whether this is the expected "not applicable" outcome of a check.
    pub fn is_check_failure(&self) -> bool {
        matches!(self, Self::Check { .. })
    }

    /// The stage label of an execute failure.
    pub fn stage(&self) -> Option<&str> {
        match self {
            Self::Execute { stage, .. } => Some(stage),
            _ => None,
        }
    }
}

/// Errors surfaced by producers and the process lifecycle.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// A filesystem operation needed by a producer failed.
    #[error("filesystem error: {0}")]
    Filesystem(#[from] FsError),

    /// The job queue was closed while a producer was still pushing.
    #[error("job queue closed")]
    QueueClosed,

    /// The consumer task ended without acknowledging.
    #[error("consumer task failed: {0}")]
    ConsumerFailed(String),
}

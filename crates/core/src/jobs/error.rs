//! Check failures reported by the concrete jobs.

use thiserror::Error;

/// Reasons a job does not apply to its file.
///
/// These are the expected outcomes of a check; the consumer logs them at
/// info and moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CheckFailure {
    #[error("File removed prior to processing")]
    Removed,

    #[error("File is a directory")]
    IsDirectory,

    #[error("File has already been processed")]
    AlreadyProcessed,

    #[error("File has no exif data")]
    NoExifData,

    #[error("Exif data has no known date")]
    NoExifDate,

    #[error("will only transcode files that have been named correctly (/YYYY/MM/YYYY_MM_DD_HH:MM:SS_xxxx.ext)")]
    NotRenamed,

    #[error("file is already an mp4 file")]
    AlreadyMp4,

    #[error("file doesn't appear to be a video file")]
    NotVideo,

    #[error("file is not a duplicate")]
    NotDuplicate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::JobError;

    #[test]
    fn test_check_failure_becomes_job_check_error() {
        let err = JobError::check(CheckFailure::AlreadyMp4);
        assert!(err.is_check_failure());
        assert_eq!(err.to_string(), "file is already an mp4 file");
    }
}

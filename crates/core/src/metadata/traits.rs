//! Trait definitions for the metadata module.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::path::Path;

use super::error::MetadataError;

/// Reads the capture date embedded in a media file.
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    /// Returns the name of this extractor implementation.
    fn name(&self) -> &str;

    /// Capture date of the file at `path` (a host path).
    async fn capture_date(&self, path: &Path) -> Result<NaiveDateTime, MetadataError>;
}

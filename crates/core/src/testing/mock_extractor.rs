//! Mock metadata extractor for testing.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::metadata::{MetadataError, MetadataExtractor};

#[derive(Debug, Clone)]
enum Outcome {
    Date(NaiveDateTime),
    NoDate,
    Unreadable,
    ToolMissing,
}

/// Mock implementation of the MetadataExtractor trait.
///
/// Paths without a configured outcome report `NoDate`. Every call is recorded.
#[derive(Debug, Clone, Default)]
pub struct MockExtractor {
    outcomes: Arc<RwLock<HashMap<PathBuf, Outcome>>>,
    calls: Arc<RwLock<Vec<PathBuf>>>,
}

impl MockExtractor {
    /// Create a new mock extractor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `date` for `path`.
    pub async fn set_date(&self, path: impl AsRef<Path>, date: NaiveDateTime) {
        self.set(path, Outcome::Date(date)).await;
    }

    /// Report an unreadable file for `path`.
    pub async fn set_unreadable(&self, path: impl AsRef<Path>) {
        self.set(path, Outcome::Unreadable).await;
    }

    /// Report a missing exiftool binary for `path`.
    pub async fn set_tool_missing(&self, path: impl AsRef<Path>) {
        self.set(path, Outcome::ToolMissing).await;
    }

    /// Paths queried so far, in order.
    pub async fn calls(&self) -> Vec<PathBuf> {
        self.calls.read().await.clone()
    }

    async fn set(&self, path: impl AsRef<Path>, outcome: Outcome) {
        self.outcomes
            .write()
            .await
            .insert(path.as_ref().to_path_buf(), outcome);
    }
}

#[async_trait]
impl MetadataExtractor for MockExtractor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn capture_date(&self, path: &Path) -> Result<NaiveDateTime, MetadataError> {
        self.calls.write().await.push(path.to_path_buf());

        let outcome = self
            .outcomes
            .read()
            .await
            .get(path)
            .cloned()
            .unwrap_or(Outcome::NoDate);

        match outcome {
            Outcome::Date(date) => Ok(date),
            Outcome::NoDate => Err(MetadataError::NoDate),
            Outcome::Unreadable => Err(MetadataError::unreadable("unknown file type")),
            Outcome::ToolMissing => Err(MetadataError::ToolNotFound {
                path: PathBuf::from("exiftool"),
            }),
        }
    }
}

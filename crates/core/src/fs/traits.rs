//! Trait definitions for the filesystem module.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;

use super::error::FsError;
use super::glob::{glob_matches, split_pattern};
use super::types::{FileStat, FsEvent};

/// A live change-notification subscription.
pub trait Watcher: Send + Sync {
    /// Stops the subscription and closes its event stream.
    ///
    /// Closing an already closed watcher is a no-op.
    fn close(&self) -> Result<(), FsError>;
}

/// A rooted filesystem shared by producers and jobs.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Returns the name of this filesystem implementation.
    fn name(&self) -> &str;

    /// Fetches metadata for a path.
    async fn stat(&self, path: &Path) -> Result<FileStat, FsError>;

    /// Opens a file for reading.
    async fn open(&self, path: &Path) -> Result<Box<dyn AsyncRead + Send + Unpin>, FsError>;

    /// Moves a file, replacing the destination if it exists.
    async fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError>;

    /// Removes a file.
    async fn remove(&self, path: &Path) -> Result<(), FsError>;

    /// Creates a directory and all missing parents.
    async fn mkdir_all(&self, path: &Path) -> Result<(), FsError>;

    /// Lists a directory, sorted by name.
    async fn read_dir(&self, path: &Path) -> Result<Vec<FileStat>, FsError>;

    /// Subscribes to changes below `root`.
    ///
    /// The returned stream ends once the watcher is closed.
    async fn watch(
        &self,
        root: &Path,
        buffer: usize,
    ) -> Result<(Arc<dyn Watcher>, mpsc::Receiver<FsEvent>), FsError>;

    /// Resolves a root-relative path to the path external tools should use.
    fn host_path(&self, path: &Path) -> PathBuf;

    /// Lists entries matching a pattern with `*`/`?` in the final component.
    ///
    /// A missing directory yields no matches. Results are sorted.
    async fn glob(&self, pattern: &Path) -> Result<Vec<PathBuf>, FsError> {
        let (dir, name_pattern) = split_pattern(pattern);
        let entries = match self.read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut matches: Vec<PathBuf> = entries
            .into_iter()
            .filter(|entry| glob_matches(&name_pattern, entry.name()))
            .map(|entry| entry.path)
            .collect();
        matches.sort();
        Ok(matches)
    }
}

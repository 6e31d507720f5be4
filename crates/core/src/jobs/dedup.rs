//! Finds files whose contents were already seen.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::sync::Mutex;
use tracing::info;

use crate::fs::{FileSystem, FsError};
use crate::process::{Job, JobError, JobFactory};

use super::config::DedupMode;
use super::error::CheckFailure;

/// Suffix of the directory duplicates of a file are moved into.
pub const DUPLICATES_SUFFIX: &str = "-duplicates";

/// SHA-256 digests of every file checked so far, mapped to the first file
/// that had them.
///
/// Shared by all dedup jobs of a process.
#[derive(Debug, Default)]
pub struct DigestIndex {
    seen: Mutex<HashMap<Vec<u8>, PathBuf>>,
}

impl DigestIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `path` under `digest`, or returns the file recorded before it.
    async fn claim(&self, digest: Vec<u8>, path: &Path) -> Option<PathBuf> {
        let mut seen = self.seen.lock().await;
        match seen.get(&digest) {
            Some(original) => Some(original.clone()),
            None => {
                seen.insert(digest, path.to_path_buf());
                None
            }
        }
    }

    /// Number of distinct contents seen.
    pub async fn len(&self) -> usize {
        self.seen.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.seen.lock().await.is_empty()
    }
}

async fn digest(fs: &dyn FileSystem, path: &Path) -> Result<Vec<u8>, FsError> {
    let mut reader = fs.open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = reader
            .read(&mut buf)
            .await
            .map_err(|e| FsError::from_io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_vec())
}

/// Moves aside or deletes a file whose contents match an earlier file.
pub struct DedupJob {
    fs: Arc<dyn FileSystem>,
    filename: PathBuf,
    index: Arc<DigestIndex>,
    mode: DedupMode,
    original: Option<PathBuf>,
}

impl DedupJob {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        filename: impl Into<PathBuf>,
        index: Arc<DigestIndex>,
        mode: DedupMode,
    ) -> Self {
        Self {
            fs,
            filename: filename.into(),
            index,
            mode,
            original: None,
        }
    }

    async fn relocate(&self, original: &Path) -> Result<PathBuf, JobError> {
        let mut dir = original.as_os_str().to_owned();
        dir.push(DUPLICATES_SUFFIX);
        let dir = PathBuf::from(dir);

        self.fs.mkdir_all(&dir).await.map_err(|e| {
            JobError::execute(format!("failed creating directory {:?}", dir), e)
        })?;

        let name = self
            .filename
            .file_name()
            .ok_or_else(|| JobError::unexpected(format!("{:?} has no file name", self.filename)))?;
        let target = dir.join(name);
        info!("Renaming {:?} to {:?}", self.filename, target);
        self.fs.rename(&self.filename, &target).await.map_err(|e| {
            JobError::execute(
                format!("failed to rename {:?} to {:?}", self.filename, target),
                e,
            )
        })?;
        Ok(target)
    }
}

#[async_trait]
impl Job for DedupJob {
    fn name(&self) -> String {
        self.filename.display().to_string()
    }

    async fn check(&mut self) -> Result<(), JobError> {
        match self.fs.stat(&self.filename).await {
            Ok(stat) if stat.is_dir => return Err(JobError::check(CheckFailure::IsDirectory)),
            Ok(_) => {}
            Err(e) if e.is_not_found() => return Err(JobError::check(CheckFailure::Removed)),
            Err(e) => return Err(JobError::unexpected(e)),
        }

        let digest = digest(self.fs.as_ref(), &self.filename)
            .await
            .map_err(JobError::unexpected)?;

        match self.index.claim(digest, &self.filename).await {
            Some(original) if original != self.filename => {
                info!("{:?} is a duplicate of {:?}", self.filename, original);
                self.original = Some(original);
                Ok(())
            }
            _ => Err(JobError::check(CheckFailure::NotDuplicate)),
        }
    }

    async fn execute(&mut self) -> Result<(), JobError> {
        let original = self
            .original
            .clone()
            .ok_or_else(|| JobError::unexpected("execute called before a successful check"))?;

        match self.mode {
            DedupMode::Relocate => {
                self.filename = self.relocate(&original).await?;
            }
            DedupMode::Remove => {
                info!("Removing {:?}", self.filename);
                self.fs.remove(&self.filename).await.map_err(|e| {
                    JobError::execute(format!("failed to remove {:?}", self.filename), e)
                })?;
            }
        }
        Ok(())
    }
}

/// Creates a [`DedupJob`] for every file outside the duplicates directories.
pub struct DedupFactory {
    index: Arc<DigestIndex>,
    mode: DedupMode,
}

impl DedupFactory {
    pub fn new(mode: DedupMode) -> Self {
        Self {
            index: Arc::new(DigestIndex::new()),
            mode,
        }
    }

    /// The index shared by every job this factory creates.
    pub fn index(&self) -> Arc<DigestIndex> {
        self.index.clone()
    }
}

impl JobFactory for DedupFactory {
    fn create(
        &self,
        fs: Arc<dyn FileSystem>,
        filename: &Path,
        _root: &Path,
    ) -> Option<Box<dyn Job>> {
        Some(Box::new(DedupJob::new(
            fs,
            filename,
            self.index.clone(),
            self.mode,
        )))
    }

    fn skip_dir(&self, path: &Path) -> bool {
        path.file_name()
            .map(|name| name.to_string_lossy().ends_with(DUPLICATES_SUFFIX))
            .unwrap_or(false)
    }
}

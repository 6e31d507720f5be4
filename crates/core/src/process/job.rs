//! The job capability and the factory producers use to create jobs.

use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::fs::FileSystem;

use super::error::JobError;

/// A unit of work for a single file, run in two phases.
///
/// `check` decides whether the job applies and may cache what it learns;
/// `execute` performs the side effects and only runs after a successful
/// check. Both phases run on the single consumer task.
#[async_trait]
pub trait Job: Send {
    /// Identifies the job in logs, usually the file path.
    fn name(&self) -> String;

    /// Decides whether the job should run.
    async fn check(&mut self) -> Result<(), JobError>;

    /// Performs the job's side effects.
    async fn execute(&mut self) -> Result<(), JobError>;
}

/// Creates jobs for discovered files.
///
/// Any `Fn(Arc<dyn FileSystem>, &Path, &Path) -> Option<Box<dyn Job>>`
/// closure is a factory that skips nothing.
pub trait JobFactory: Send + Sync {
    /// Creates the job for `filename`, found under `root`; `None` skips it.
    fn create(&self, fs: Arc<dyn FileSystem>, filename: &Path, root: &Path)
        -> Option<Box<dyn Job>>;

    /// Whether a file should produce no job at all.
    fn skip_file(&self, _path: &Path) -> bool {
        false
    }

    /// Whether a directory's whole subtree should be ignored.
    fn skip_dir(&self, _path: &Path) -> bool {
        false
    }
}

impl<F> JobFactory for F
where
    F: Fn(Arc<dyn FileSystem>, &Path, &Path) -> Option<Box<dyn Job>> + Send + Sync,
{
    fn create(
        &self,
        fs: Arc<dyn FileSystem>,
        filename: &Path,
        root: &Path,
    ) -> Option<Box<dyn Job>> {
        self(fs, filename, root)
    }
}

/// A filesystem together with the root it was opened on.
///
/// `path` is what the user named on the command line; it is handed to the
/// job factory and used in log messages.
#[derive(Clone)]
pub struct Root {
    pub fs: Arc<dyn FileSystem>,
    pub path: PathBuf,
}

impl Root {
    pub fn new(fs: Arc<dyn FileSystem>, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }
}

impl fmt::Debug for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Root")
            .field("fs", &self.fs.name())
            .field("path", &self.path)
            .finish()
    }
}

/// Whether `path` lies inside a directory the factory wants pruned.
pub(crate) fn in_skipped_dir(factory: &dyn JobFactory, path: &Path) -> bool {
    path.ancestors()
        .skip(1)
        .take_while(|dir| *dir != Path::new("/") && !dir.as_os_str().is_empty())
        .any(|dir| factory.skip_dir(dir))
}

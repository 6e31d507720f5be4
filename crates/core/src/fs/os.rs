//! Filesystem backed by the host OS, rooted at a directory.

use async_trait::async_trait;
use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::error::FsError;
use super::traits::{FileSystem, Watcher};
use super::types::{EventMask, FileStat, FsEvent};

/// A [`FileSystem`] over a directory of the host filesystem.
#[derive(Debug, Clone)]
pub struct OsFileSystem {
    root: PathBuf,
}

impl OsFileSystem {
    /// Opens a filesystem rooted at `root`, which must be an existing directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, FsError> {
        let root = root.as_ref();
        let root = std::fs::canonicalize(root).map_err(|e| FsError::from_io(root, e))?;
        if !root.is_dir() {
            return Err(FsError::InvalidPath { path: root });
        }
        Ok(Self { root })
    }

    /// Host directory this filesystem is rooted at.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a root-relative path onto the host, refusing `..` components.
    fn resolve(&self, path: &Path) -> Result<PathBuf, FsError> {
        let mut resolved = self.root.clone();
        for component in path.components() {
            match component {
                Component::RootDir | Component::CurDir => {}
                Component::Normal(part) => resolved.push(part),
                Component::ParentDir | Component::Prefix(_) => {
                    return Err(FsError::InvalidPath {
                        path: path.to_path_buf(),
                    })
                }
            }
        }
        Ok(resolved)
    }

    /// Maps a host path back to a root-relative one.
    fn relative(root: &Path, host: &Path) -> Option<PathBuf> {
        host.strip_prefix(root)
            .ok()
            .map(|rel| Path::new("/").join(rel))
    }

    fn translate(root: &Path, event: Event) -> Vec<FsEvent> {
        let mask = match event.kind {
            EventKind::Create(_) => EventMask::CREATE,
            // Files moved into the tree are announced as creations
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                EventMask::CREATE | EventMask::RENAME
            }
            EventKind::Modify(ModifyKind::Name(_)) => EventMask::RENAME,
            EventKind::Modify(_) => EventMask::MODIFY,
            EventKind::Remove(_) => EventMask::REMOVE,
            EventKind::Any | EventKind::Access(_) | EventKind::Other => return Vec::new(),
        };

        event
            .paths
            .iter()
            .filter_map(|p| Self::relative(root, p))
            .map(|path| FsEvent { path, mask })
            .collect()
    }
}

/// Watcher handle wrapping a notify watcher.
struct NotifyWatcher {
    inner: Mutex<Option<RecommendedWatcher>>,
}

impl Watcher for NotifyWatcher {
    fn close(&self) -> Result<(), FsError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| FsError::watch("watcher lock poisoned"))?;
        // Dropping the notify watcher drops its handler, which closes the stream
        drop(guard.take());
        Ok(())
    }
}

#[async_trait]
impl FileSystem for OsFileSystem {
    fn name(&self) -> &str {
        "os"
    }

    async fn stat(&self, path: &Path) -> Result<FileStat, FsError> {
        let host = self.resolve(path)?;
        let meta = tokio::fs::metadata(&host)
            .await
            .map_err(|e| FsError::from_io(path, e))?;
        Ok(FileStat {
            path: path.to_path_buf(),
            is_dir: meta.is_dir(),
            size: if meta.is_dir() { 0 } else { meta.len() },
        })
    }

    async fn open(&self, path: &Path) -> Result<Box<dyn AsyncRead + Send + Unpin>, FsError> {
        let host = self.resolve(path)?;
        let file = tokio::fs::File::open(&host)
            .await
            .map_err(|e| FsError::from_io(path, e))?;
        Ok(Box::new(file))
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        let host_from = self.resolve(from)?;
        let host_to = self.resolve(to)?;
        tokio::fs::rename(&host_from, &host_to)
            .await
            .map_err(|e| FsError::from_io(from, e))
    }

    async fn remove(&self, path: &Path) -> Result<(), FsError> {
        let host = self.resolve(path)?;
        tokio::fs::remove_file(&host)
            .await
            .map_err(|e| FsError::from_io(path, e))
    }

    async fn mkdir_all(&self, path: &Path) -> Result<(), FsError> {
        let host = self.resolve(path)?;
        let mut builder = tokio::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o750);
        builder
            .create(&host)
            .await
            .map_err(|e| FsError::from_io(path, e))
    }

    async fn read_dir(&self, path: &Path) -> Result<Vec<FileStat>, FsError> {
        let host = self.resolve(path)?;
        let mut dir = tokio::fs::read_dir(&host)
            .await
            .map_err(|e| FsError::from_io(path, e))?;

        let mut entries = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| FsError::from_io(path, e))?
        {
            let entry_path = path.join(entry.file_name());
            match entry.metadata().await {
                Ok(meta) => entries.push(FileStat {
                    path: entry_path,
                    is_dir: meta.is_dir(),
                    size: if meta.is_dir() { 0 } else { meta.len() },
                }),
                // Entry vanished between listing and stat
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!("Skipping vanished entry {:?}", entry_path);
                }
                Err(e) => return Err(FsError::from_io(entry_path, e)),
            }
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    async fn watch(
        &self,
        root: &Path,
        buffer: usize,
    ) -> Result<(Arc<dyn Watcher>, mpsc::Receiver<FsEvent>), FsError> {
        let host_root = self.resolve(root)?;
        let fs_root = self.root.clone();
        let (tx, rx) = mpsc::channel(buffer.max(1));

        // Runs on notify's own thread, so blocking_send is safe here
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    for fs_event in OsFileSystem::translate(&fs_root, event) {
                        if tx.blocking_send(fs_event).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => warn!("Watch error: {}", e),
            },
            Config::default(),
        )
        .map_err(|e| FsError::watch(format!("failed to create watcher: {}", e)))?;

        watcher
            .watch(&host_root, RecursiveMode::Recursive)
            .map_err(|e| FsError::watch(format!("failed to watch {:?}: {}", host_root, e)))?;

        let handle: Arc<dyn Watcher> = Arc::new(NotifyWatcher {
            inner: Mutex::new(Some(watcher)),
        });
        Ok((handle, rx))
    }

    fn host_path(&self, path: &Path) -> PathBuf {
        self.resolve(path).unwrap_or_else(|_| self.root.clone())
    }
}

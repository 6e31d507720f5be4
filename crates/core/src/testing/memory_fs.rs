//! In-memory filesystem for testing.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{Cursor, ErrorKind};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::io::AsyncRead;
use tokio::sync::{mpsc, RwLock};

use crate::fs::{FileStat, FileSystem, FsError, FsEvent, Watcher};

/// Operations that can be made to fail on a given path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailOp {
    Stat,
    Open,
    Rename,
    Remove,
    MkdirAll,
    ReadDir,
}

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File(Vec<u8>),
}

#[derive(Debug, Default)]
struct State {
    nodes: BTreeMap<PathBuf, Node>,
    failures: HashSet<(FailOp, PathBuf)>,
    renames: Vec<(PathBuf, PathBuf)>,
}

#[derive(Debug, Default)]
struct WatchRegistry {
    next_id: u64,
    open: HashMap<u64, (PathBuf, mpsc::Sender<FsEvent>)>,
    opened: usize,
    closed: usize,
}

/// Mock implementation of the FileSystem trait.
///
/// Provides controllable behavior for testing:
/// - An in-memory tree of files and directories
/// - Injected change notifications via [`MemoryFileSystem::emit`]
/// - Per-path failure injection
/// - Recorded renames for assertions
///
/// # Example
///
/// ```rust,ignore
/// use mediacleaner_core::testing::{FailOp, MemoryFileSystem};
///
/// let fs = MemoryFileSystem::new();
/// fs.add_file("/IMG_20130525_125511.jpg", b"jpeg").await;
/// fs.fail_on(FailOp::Rename, "/IMG_20130525_125511.jpg").await;
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    state: Arc<RwLock<State>>,
    watchers: Arc<Mutex<WatchRegistry>>,
}

fn normalize(path: impl AsRef<Path>) -> PathBuf {
    let mut out = PathBuf::from("/");
    for component in path.as_ref().components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::ParentDir => {
                out.pop();
            }
            _ => {}
        }
    }
    out
}

fn injected(path: &Path) -> FsError {
    FsError::Io {
        path: path.to_path_buf(),
        source: std::io::Error::new(ErrorKind::PermissionDenied, "injected failure"),
    }
}

fn not_found(path: &Path) -> FsError {
    FsError::NotFound {
        path: path.to_path_buf(),
    }
}

impl State {
    fn check(&self, op: FailOp, path: &Path) -> Result<(), FsError> {
        if self.failures.contains(&(op, path.to_path_buf())) {
            return Err(injected(path));
        }
        Ok(())
    }

    fn is_dir(&self, path: &Path) -> bool {
        path == Path::new("/") || matches!(self.nodes.get(path), Some(Node::Dir))
    }

    fn mkdir_all(&mut self, path: &Path) -> Result<(), FsError> {
        let mut current = PathBuf::from("/");
        for component in path.components().skip(1) {
            current.push(component);
            if matches!(self.nodes.get(&current), Some(Node::File(_))) {
                return Err(FsError::Io {
                    path: current,
                    source: std::io::Error::new(ErrorKind::Other, "not a directory"),
                });
            }
            self.nodes.entry(current.clone()).or_insert(Node::Dir);
        }
        Ok(())
    }

    fn stat(&self, path: &Path) -> Option<FileStat> {
        if path == Path::new("/") {
            return Some(FileStat {
                path: path.to_path_buf(),
                is_dir: true,
                size: 0,
            });
        }
        self.nodes.get(path).map(|node| match node {
            Node::Dir => FileStat {
                path: path.to_path_buf(),
                is_dir: true,
                size: 0,
            },
            Node::File(data) => FileStat {
                path: path.to_path_buf(),
                is_dir: false,
                size: data.len() as u64,
            },
        })
    }
}

impl MemoryFileSystem {
    /// Create an empty filesystem holding only the root directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, creating missing parent directories.
    pub async fn add_file(&self, path: impl AsRef<Path>, contents: &[u8]) {
        let path = normalize(path);
        let mut state = self.state.write().await;
        if let Some(parent) = path.parent() {
            let _ = state.mkdir_all(parent);
        }
        state.nodes.insert(path, Node::File(contents.to_vec()));
    }

    /// Add a directory and its missing parents.
    pub async fn add_dir(&self, path: impl AsRef<Path>) {
        let path = normalize(path);
        let _ = self.state.write().await.mkdir_all(&path);
    }

    /// Whether anything exists at `path`.
    pub async fn exists(&self, path: impl AsRef<Path>) -> bool {
        let path = normalize(path);
        self.state.read().await.stat(&path).is_some()
    }

    /// Contents of the file at `path`.
    pub async fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        let path = normalize(path);
        match self.state.read().await.nodes.get(&path) {
            Some(Node::File(data)) => Some(data.clone()),
            _ => None,
        }
    }

    /// All file paths, sorted.
    pub async fn files(&self) -> Vec<PathBuf> {
        self.state
            .read()
            .await
            .nodes
            .iter()
            .filter(|(_, node)| matches!(node, Node::File(_)))
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Make `op` fail on `path` until [`MemoryFileSystem::clear_failures`].
    pub async fn fail_on(&self, op: FailOp, path: impl AsRef<Path>) {
        let path = normalize(path);
        self.state.write().await.failures.insert((op, path));
    }

    /// Remove all injected failures.
    pub async fn clear_failures(&self) {
        self.state.write().await.failures.clear();
    }

    /// Renames performed so far, in order.
    pub async fn recorded_renames(&self) -> Vec<(PathBuf, PathBuf)> {
        self.state.read().await.renames.clone()
    }

    /// Deliver an event to every open watcher whose root contains the path.
    ///
    /// Returns how many watchers received it.
    pub async fn emit(&self, event: FsEvent) -> usize {
        let targets: Vec<mpsc::Sender<FsEvent>> = match self.watchers.lock() {
            Ok(registry) => registry
                .open
                .values()
                .filter(|(root, _)| event.path.starts_with(root))
                .map(|(_, tx)| tx.clone())
                .collect(),
            Err(_) => return 0,
        };

        let mut delivered = 0;
        for tx in targets {
            if tx.send(event.clone()).await.is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    /// Number of watchers currently open.
    pub fn open_watchers(&self) -> usize {
        self.watchers.lock().map(|r| r.open.len()).unwrap_or(0)
    }

    /// Number of watchers ever opened.
    pub fn opened_watchers(&self) -> usize {
        self.watchers.lock().map(|r| r.opened).unwrap_or(0)
    }

    /// Number of watchers closed so far.
    pub fn closed_watchers(&self) -> usize {
        self.watchers.lock().map(|r| r.closed).unwrap_or(0)
    }
}

struct MemoryWatcher {
    id: u64,
    registry: Arc<Mutex<WatchRegistry>>,
}

impl Watcher for MemoryWatcher {
    fn close(&self) -> Result<(), FsError> {
        let mut registry = self
            .registry
            .lock()
            .map_err(|_| FsError::watch("watch registry poisoned"))?;
        if registry.open.remove(&self.id).is_some() {
            registry.closed += 1;
        }
        Ok(())
    }
}

#[async_trait]
impl FileSystem for MemoryFileSystem {
    fn name(&self) -> &str {
        "memory"
    }

    async fn stat(&self, path: &Path) -> Result<FileStat, FsError> {
        let path = normalize(path);
        let state = self.state.read().await;
        state.check(FailOp::Stat, &path)?;
        state.stat(&path).ok_or_else(|| not_found(&path))
    }

    async fn open(&self, path: &Path) -> Result<Box<dyn AsyncRead + Send + Unpin>, FsError> {
        let path = normalize(path);
        let state = self.state.read().await;
        state.check(FailOp::Open, &path)?;
        match state.nodes.get(&path) {
            Some(Node::File(data)) => Ok(Box::new(Cursor::new(data.clone()))),
            Some(Node::Dir) => Err(FsError::InvalidPath { path }),
            None => Err(not_found(&path)),
        }
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        let from = normalize(from);
        let to = normalize(to);
        let mut state = self.state.write().await;
        state.check(FailOp::Rename, &from)?;

        match state.nodes.get(&from) {
            Some(Node::File(_)) => {}
            Some(Node::Dir) => return Err(FsError::InvalidPath { path: from }),
            None => return Err(not_found(&from)),
        }
        let parent_ok = to.parent().map(|p| state.is_dir(p)).unwrap_or(false);
        if !parent_ok {
            return Err(not_found(&to));
        }

        if let Some(node) = state.nodes.remove(&from) {
            state.nodes.insert(to.clone(), node);
        }
        state.renames.push((from, to));
        Ok(())
    }

    async fn remove(&self, path: &Path) -> Result<(), FsError> {
        let path = normalize(path);
        let mut state = self.state.write().await;
        state.check(FailOp::Remove, &path)?;
        match state.nodes.remove(&path) {
            Some(Node::File(_)) => Ok(()),
            Some(Node::Dir) => {
                state.nodes.insert(path.clone(), Node::Dir);
                Err(FsError::InvalidPath { path })
            }
            None => Err(not_found(&path)),
        }
    }

    async fn mkdir_all(&self, path: &Path) -> Result<(), FsError> {
        let path = normalize(path);
        let mut state = self.state.write().await;
        state.check(FailOp::MkdirAll, &path)?;
        state.mkdir_all(&path)
    }

    async fn read_dir(&self, path: &Path) -> Result<Vec<FileStat>, FsError> {
        let path = normalize(path);
        let state = self.state.read().await;
        state.check(FailOp::ReadDir, &path)?;
        if !state.is_dir(&path) {
            return match state.nodes.get(&path) {
                Some(_) => Err(FsError::InvalidPath { path }),
                None => Err(not_found(&path)),
            };
        }

        let entries = state
            .nodes
            .keys()
            .filter(|p| p.parent() == Some(path.as_path()))
            .filter_map(|p| state.stat(p))
            .collect();
        Ok(entries)
    }

    async fn watch(
        &self,
        root: &Path,
        buffer: usize,
    ) -> Result<(Arc<dyn Watcher>, mpsc::Receiver<FsEvent>), FsError> {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let mut registry = self
            .watchers
            .lock()
            .map_err(|_| FsError::watch("watch registry poisoned"))?;
        let id = registry.next_id;
        registry.next_id += 1;
        registry.opened += 1;
        registry.open.insert(id, (normalize(root), tx));

        let watcher: Arc<dyn Watcher> = Arc::new(MemoryWatcher {
            id,
            registry: Arc::clone(&self.watchers),
        });
        Ok((watcher, rx))
    }

    fn host_path(&self, path: &Path) -> PathBuf {
        normalize(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::EventMask;

    #[tokio::test]
    async fn test_add_and_stat() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/2010/01/a.jpg", b"abc").await;

        let stat = fs.stat(Path::new("/2010/01/a.jpg")).await.unwrap();
        assert_eq!(stat.size, 3);
        assert!(!stat.is_dir);
        assert!(fs.stat(Path::new("/2010")).await.unwrap().is_dir);
        assert!(fs.stat(Path::new("/nope")).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_read_dir_lists_children_sorted() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/b.jpg", b"").await;
        fs.add_file("/a/x.jpg", b"").await;
        fs.add_file("/c.jpg", b"").await;

        let names: Vec<String> = fs
            .read_dir(Path::new("/"))
            .await
            .unwrap()
            .iter()
            .map(|e| e.name().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b.jpg", "c.jpg"]);
    }

    #[tokio::test]
    async fn test_rename_requires_parent() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/a.jpg", b"").await;
        let err = fs
            .rename(Path::new("/a.jpg"), Path::new("/2010/01/a.jpg"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        fs.mkdir_all(Path::new("/2010/01")).await.unwrap();
        fs.rename(Path::new("/a.jpg"), Path::new("/2010/01/a.jpg"))
            .await
            .unwrap();
        assert!(fs.exists("/2010/01/a.jpg").await);
        assert!(!fs.exists("/a.jpg").await);
        assert_eq!(fs.recorded_renames().await.len(), 1);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/a.jpg", b"").await;
        fs.fail_on(FailOp::Remove, "/a.jpg").await;
        assert!(fs.remove(Path::new("/a.jpg")).await.is_err());

        fs.clear_failures().await;
        fs.remove(Path::new("/a.jpg")).await.unwrap();
        assert!(!fs.exists("/a.jpg").await);
    }

    #[tokio::test]
    async fn test_emit_reaches_open_watchers_only() {
        let fs = MemoryFileSystem::new();
        let (watcher, mut rx) = fs.watch(Path::new("/"), 4).await.unwrap();

        let delivered = fs.emit(FsEvent::new("/a.jpg", EventMask::CREATE)).await;
        assert_eq!(delivered, 1);
        assert_eq!(rx.recv().await.unwrap().path, PathBuf::from("/a.jpg"));

        watcher.close().unwrap();
        watcher.close().unwrap();
        assert_eq!(fs.closed_watchers(), 1);
        assert_eq!(fs.emit(FsEvent::new("/b.jpg", EventMask::CREATE)).await, 0);
        assert!(rx.recv().await.is_none());
    }
}

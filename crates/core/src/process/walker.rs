//! One-shot traversal of a root.

use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use super::error::ProcessError;
use super::job::{Job, JobFactory, Root};

/// Sending half of the job queue.
pub type JobSink = mpsc::Sender<Box<dyn Job>>;

/// Walks `root` depth first in name order, pushing a job per file.
///
/// Directories never become jobs; a directory the factory skips is pruned
/// with its whole subtree. Pushing waits while the queue is full. A
/// filesystem error aborts the walk and is returned.
///
/// Returns the number of jobs pushed.
pub async fn walk(
    root: &Root,
    queue: &JobSink,
    factory: &dyn JobFactory,
) -> Result<usize, ProcessError> {
    let mut pending: Vec<_> = root.fs.read_dir(Path::new("/")).await?;
    pending.reverse();
    let mut pushed = 0;

    while let Some(entry) = pending.pop() {
        if entry.is_dir {
            if factory.skip_dir(&entry.path) {
                debug!("Pruning {:?}", entry.path);
                continue;
            }
            let children = root.fs.read_dir(&entry.path).await?;
            pending.extend(children.into_iter().rev());
            continue;
        }

        if factory.skip_file(&entry.path) {
            continue;
        }

        if let Some(job) = factory.create(Arc::clone(&root.fs), &entry.path, &root.path) {
            queue
                .send(job)
                .await
                .map_err(|_| ProcessError::QueueClosed)?;
            pushed += 1;
        }
    }

    Ok(pushed)
}

//! Turns creation notifications into jobs.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::fs::FsEvent;

use super::error::ProcessError;
use super::job::{in_skipped_dir, JobFactory, Root};
use super::walker::JobSink;

/// Consumes `events` until the stream ends, pushing a job per created file.
///
/// Only creation events are considered. The path is stat'ed again before a
/// job is created; if that fails the event is logged and dropped.
/// Directories, skipped files and files inside skipped directories produce
/// no job. Returns the number of jobs pushed once the watcher is closed.
pub async fn watch(
    root: &Root,
    mut events: mpsc::Receiver<FsEvent>,
    queue: &JobSink,
    factory: &dyn JobFactory,
) -> Result<usize, ProcessError> {
    let mut pushed = 0;

    while let Some(event) = events.recv().await {
        if !event.is_create() {
            continue;
        }

        let stat = match root.fs.stat(&event.path).await {
            Ok(stat) => stat,
            Err(e) => {
                warn!("Failed to stat {:?} after create event: {}", event.path, e);
                continue;
            }
        };
        if stat.is_dir {
            continue;
        }
        if factory.skip_file(&stat.path) || in_skipped_dir(factory, &stat.path) {
            debug!("Ignoring created file {:?}", stat.path);
            continue;
        }

        if let Some(job) = factory.create(Arc::clone(&root.fs), &stat.path, &root.path) {
            queue
                .send(job)
                .await
                .map_err(|_| ProcessError::QueueClosed)?;
            pushed += 1;
        }
    }

    debug!("Event stream for {:?} ended", root.path);
    Ok(pushed)
}

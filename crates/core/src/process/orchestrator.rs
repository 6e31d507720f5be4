//! Process orchestrator: many producers, one consumer.
//!
//! Scan and watch producers push into one bounded queue. A single consumer
//! runs check then execute for every job, in dequeue order, and also
//! listens for kill requests and watcher registrations. A supervisor task
//! joins all producers and then drops the last queue sender, which is the
//! only way the queue closes.

use std::path::Path;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::fs::Watcher;

use super::config::ProcessConfig;
use super::error::ProcessError;
use super::job::{Job, JobFactory, Root};
use super::types::{ProcessState, ProcessStats, ProcessSummary};
use super::walker::{walk, JobSink};
use super::watcher::watch as watch_events;

type KillAck = oneshot::Sender<()>;

/// A running organization pass over one or more roots.
///
/// Created by [`Process::start`]; not reusable once stopped.
pub struct Process {
    kill_tx: mpsc::UnboundedSender<KillAck>,
    state_rx: watch::Receiver<ProcessState>,
    stats: Arc<ProcessStats>,
}

impl Process {
    /// Starts the consumer, then one scan and/or watch producer per root.
    ///
    /// Must be called within a tokio runtime.
    pub fn start(
        config: ProcessConfig,
        roots: Vec<Root>,
        factory: Arc<dyn JobFactory>,
    ) -> Self {
        let (queue_tx, queue_rx) = mpsc::channel::<Box<dyn Job>>(config.queue_capacity.max(1));
        let (kill_tx, kill_rx) = mpsc::unbounded_channel();
        let (register_tx, register_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ProcessState::Running);
        let stats = Arc::new(ProcessStats::default());

        let consumer = Consumer {
            jobs: queue_rx,
            kills: kill_rx,
            registrations: register_rx,
            state: state_tx,
            stats: Arc::clone(&stats),
        };
        tokio::spawn(consumer.run());

        let mut producers = JoinSet::new();
        for root in roots {
            if config.scan {
                info!("Scanning {:?}", root.path);
                producers.spawn(scan_producer(
                    root.clone(),
                    queue_tx.clone(),
                    Arc::clone(&factory),
                ));
            }
            if config.watch {
                info!("Watching {:?}", root.path);
                producers.spawn(watch_producer(
                    root.clone(),
                    config.watch_buffer,
                    queue_tx.clone(),
                    register_tx.clone(),
                    Arc::clone(&factory),
                ));
            }
        }
        drop(register_tx);

        tokio::spawn(async move {
            while let Some(result) = producers.join_next().await {
                if let Err(e) = result {
                    error!("Producer task failed: {}", e);
                }
            }
            debug!("All producers finished, closing job queue");
            drop(queue_tx);
        });

        Self {
            kill_tx,
            state_rx,
            stats,
        }
    }

    /// Stops all watchers and waits until every queued job has been processed.
    ///
    /// Scans in progress are not interrupted. Safe to call any number of
    /// times, including after the process has stopped.
    pub async fn kill(&self) -> Result<(), ProcessError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.kill_tx.send(ack_tx).is_err() {
            // Consumer is already past its loop
            self.wait().await;
            return Ok(());
        }

        match ack_rx.await {
            Ok(()) => Ok(()),
            Err(_) => {
                self.wait().await;
                Err(ProcessError::ConsumerFailed(
                    "consumer ended without acknowledging kill".to_string(),
                ))
            }
        }
    }

    /// Waits until the consumer has stopped.
    pub async fn wait(&self) {
        let mut state_rx = self.state_rx.clone();
        // An error means the consumer is gone, which is as stopped as it gets
        let _ = state_rx
            .wait_for(|state| *state == ProcessState::Stopped)
            .await;
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ProcessState {
        *self.state_rx.borrow()
    }

    /// Counters of what the consumer has done so far.
    pub fn summary(&self) -> ProcessSummary {
        self.stats.to_summary()
    }
}

async fn scan_producer(root: Root, queue: JobSink, factory: Arc<dyn JobFactory>) {
    match walk(&root, &queue, factory.as_ref()).await {
        Ok(pushed) => info!("Finished scanning {:?} ({} jobs)", root.path, pushed),
        Err(e) => error!("Failed scanning {:?}: {}", root.path, e),
    }
}

async fn watch_producer(
    root: Root,
    buffer: usize,
    queue: JobSink,
    register: mpsc::UnboundedSender<Arc<dyn Watcher>>,
    factory: Arc<dyn JobFactory>,
) {
    let (watcher, events) = match root.fs.watch(Path::new("/"), buffer).await {
        Ok(subscription) => subscription,
        Err(e) => {
            error!("Failed to watch {:?}: {}", root.path, e);
            return;
        }
    };

    if register.send(Arc::clone(&watcher)).is_err() {
        // No consumer left to close it for us
        if let Err(e) = watcher.close() {
            warn!("Failed to close watcher for {:?}: {}", root.path, e);
        }
        return;
    }
    drop(register);

    match watch_events(&root, events, &queue, factory.as_ref()).await {
        Ok(pushed) => info!("Stopped watching {:?} ({} jobs)", root.path, pushed),
        Err(e) => error!("Failed watching {:?}: {}", root.path, e),
    }
}

struct Consumer {
    jobs: mpsc::Receiver<Box<dyn Job>>,
    kills: mpsc::UnboundedReceiver<KillAck>,
    registrations: mpsc::UnboundedReceiver<Arc<dyn Watcher>>,
    state: watch::Sender<ProcessState>,
    stats: Arc<ProcessStats>,
}

impl Consumer {
    async fn run(mut self) {
        info!("Starting processing");
        let mut watchers: Vec<Arc<dyn Watcher>> = Vec::new();
        let mut acks: Vec<KillAck> = Vec::new();
        let mut killed = false;
        let mut kills_open = true;
        let mut registrations_open = true;

        loop {
            tokio::select! {
                biased;

                kill = self.kills.recv(), if kills_open => match kill {
                    Some(ack) => {
                        acks.push(ack);
                        if !killed {
                            info!("Kill requested, closing {} watchers", watchers.len());
                            killed = true;
                        }
                        self.close_watchers(&mut watchers);
                    }
                    None => kills_open = false,
                },

                watcher = self.registrations.recv(), if registrations_open => match watcher {
                    Some(watcher) => {
                        watchers.push(watcher);
                        // A watch that started after the kill must still end
                        if killed {
                            self.close_watchers(&mut watchers);
                        }
                    }
                    None => registrations_open = false,
                },

                job = self.jobs.recv() => match job {
                    Some(job) => self.process(job).await,
                    None => break,
                },
            }
        }

        self.state.send_replace(ProcessState::Draining);
        self.close_watchers(&mut watchers);

        self.kills.close();
        while let Ok(ack) = self.kills.try_recv() {
            acks.push(ack);
        }
        for ack in acks {
            let _ = ack.send(());
        }

        let summary = self.stats.to_summary();
        info!(
            "Processing finished: {} received, {} executed, {} skipped, {} failed",
            summary.received,
            summary.executed,
            summary.skipped,
            summary.check_errors + summary.execute_errors
        );
        self.state.send_replace(ProcessState::Stopped);
    }

    fn close_watchers(&self, watchers: &mut Vec<Arc<dyn Watcher>>) {
        for watcher in watchers.drain(..) {
            match watcher.close() {
                Ok(()) => ProcessStats::bump(&self.stats.watchers_closed),
                Err(e) => warn!("Failed to close watcher: {}", e),
            }
        }
    }

    async fn process(&self, mut job: Box<dyn Job>) {
        ProcessStats::bump(&self.stats.received);
        let name = job.name();

        match job.check().await {
            Ok(()) => {}
            Err(e) if e.is_check_failure() => {
                info!("Skipping {:?}: {}", name, e);
                ProcessStats::bump(&self.stats.skipped);
                return;
            }
            Err(e) => {
                error!("Failed to perform checks on {:?}: {}", name, e);
                ProcessStats::bump(&self.stats.check_errors);
                return;
            }
        }

        match job.execute().await {
            Ok(()) => {
                debug!("Processed {:?}", name);
                ProcessStats::bump(&self.stats.executed);
            }
            Err(e) => {
                error!("Failed to process {:?}: {}", name, e);
                ProcessStats::bump(&self.stats.execute_errors);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{EventMask, FileSystem, FsEvent};
    use crate::testing::{JobLog, MemoryFileSystem, MockJob};
    use std::time::Duration;
    use tokio::time::timeout;

    fn mock_factory() -> Arc<dyn JobFactory> {
        Arc::new(|_fs: Arc<dyn FileSystem>, filename: &Path, _root: &Path| {
            Some(Box::new(MockJob::new(filename.display().to_string())) as Box<dyn Job>)
        })
    }

    #[tokio::test]
    async fn test_scan_only_stops_by_itself() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/a.jpg", b"").await;
        fs.add_file("/b/c.jpg", b"").await;
        let roots = vec![Root::new(Arc::new(fs), "/media")];

        let process = Process::start(
            ProcessConfig::default().with_scan(true),
            roots,
            mock_factory(),
        );
        timeout(Duration::from_secs(5), process.wait()).await.unwrap();

        assert_eq!(process.state(), ProcessState::Stopped);
        let summary = process.summary();
        assert_eq!(summary.received, 2);
        assert_eq!(summary.executed, 2);
    }

    #[tokio::test]
    async fn test_no_producers_stops_immediately() {
        let process = Process::start(ProcessConfig::default(), Vec::new(), mock_factory());
        timeout(Duration::from_secs(5), process.wait()).await.unwrap();
        assert_eq!(process.summary(), ProcessSummary::default());
    }

    #[tokio::test]
    async fn test_kill_closes_watchers_and_stops() {
        let fs = Arc::new(MemoryFileSystem::new());
        let roots = vec![
            Root::new(fs.clone(), "/one"),
            Root::new(fs.clone(), "/two"),
        ];
        let process = Process::start(
            ProcessConfig::default().with_watch(true),
            roots,
            mock_factory(),
        );

        // Wait until both watch producers have subscribed
        timeout(Duration::from_secs(5), async {
            while fs.opened_watchers() < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        fs.add_file("/x.jpg", b"").await;
        fs.emit(FsEvent::new("/x.jpg", EventMask::CREATE)).await;

        timeout(Duration::from_secs(5), process.kill())
            .await
            .unwrap()
            .unwrap();
        timeout(Duration::from_secs(5), process.wait()).await.unwrap();

        assert_eq!(fs.open_watchers(), 0);
        assert_eq!(fs.closed_watchers(), 2);
        assert_eq!(process.state(), ProcessState::Stopped);
        // Each watcher delivered the event once
        assert_eq!(process.summary().received, 2);
    }

    #[tokio::test]
    async fn test_kill_is_idempotent() {
        let fs = Arc::new(MemoryFileSystem::new());
        let process = Process::start(
            ProcessConfig::default().with_watch(true),
            vec![Root::new(fs.clone(), "/media")],
            mock_factory(),
        );

        let (a, b) = tokio::join!(process.kill(), process.kill());
        a.unwrap();
        b.unwrap();
        timeout(Duration::from_secs(5), process.kill())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(process.state(), ProcessState::Stopped);
        assert_eq!(fs.open_watchers(), 0);
    }

    #[tokio::test]
    async fn test_kill_drains_queued_jobs() {
        let fs = MemoryFileSystem::new();
        for i in 0..50 {
            fs.add_file(format!("/{:02}.jpg", i), b"").await;
        }
        let process = Process::start(
            ProcessConfig::default().with_scan(true).with_queue_capacity(4),
            vec![Root::new(Arc::new(fs), "/media")],
            mock_factory(),
        );

        timeout(Duration::from_secs(5), process.kill())
            .await
            .unwrap()
            .unwrap();
        // Scans are not interrupted, every file was processed
        assert_eq!(process.summary().executed, 50);
    }

    #[tokio::test]
    async fn test_jobs_run_serially_in_dequeue_order() {
        let fs = MemoryFileSystem::new();
        for i in 0..20 {
            fs.add_file(format!("/{:02}.jpg", i), b"").await;
        }
        let log = JobLog::new();
        let job_log = log.clone();
        let factory: Arc<dyn JobFactory> =
            Arc::new(move |_fs: Arc<dyn FileSystem>, filename: &Path, _root: &Path| {
                let name = filename.display().to_string();
                let job = MockJob::new(name.as_str()).with_log(job_log.clone());
                let job = if name == "/03.jpg" { job.fail_check() } else { job };
                Some(Box::new(job) as Box<dyn Job>)
            });

        let process = Process::start(
            ProcessConfig::default().with_scan(true).with_queue_capacity(2),
            vec![Root::new(Arc::new(fs), "/media")],
            factory,
        );
        timeout(Duration::from_secs(5), process.wait()).await.unwrap();

        let mut want = Vec::new();
        for i in 0..20 {
            want.push(format!("check /{:02}.jpg", i));
            if i != 3 {
                want.push(format!("execute /{:02}.jpg", i));
            }
        }
        assert_eq!(log.entries().await, want);

        let summary = process.summary();
        assert_eq!(summary.received, 20);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.executed, 19);
    }

    #[tokio::test]
    async fn test_job_errors_do_not_escape() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/check.jpg", b"").await;
        fs.add_file("/error.jpg", b"").await;
        fs.add_file("/execute.jpg", b"").await;
        fs.add_file("/ok.jpg", b"").await;

        let factory: Arc<dyn JobFactory> =
            Arc::new(|_fs: Arc<dyn FileSystem>, filename: &Path, _root: &Path| {
                let name = filename.display().to_string();
                let job = match filename.to_str() {
                    Some("/check.jpg") => MockJob::new(name).fail_check(),
                    Some("/error.jpg") => MockJob::new(name).error_check(),
                    Some("/execute.jpg") => MockJob::new(name).fail_execute("failed to rename"),
                    _ => MockJob::new(name),
                };
                Some(Box::new(job) as Box<dyn Job>)
            });

        let process = Process::start(
            ProcessConfig::default().with_scan(true),
            vec![Root::new(Arc::new(fs), "/media")],
            factory,
        );
        timeout(Duration::from_secs(5), process.kill())
            .await
            .unwrap()
            .unwrap();

        let summary = process.summary();
        assert_eq!(summary.received, 4);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.check_errors, 1);
        assert_eq!(summary.execute_errors, 1);
        assert_eq!(summary.executed, 1);
    }
}

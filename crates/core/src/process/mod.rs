//! Concurrent job orchestration.
//!
//! Files discovered by scanning and/or watching one or more roots become
//! [`Job`]s that are pushed onto a single bounded queue. One consumer runs
//! each job's check and execute phases strictly in dequeue order, which keeps
//! sequence allocation race free.
//!
//! # Example
//!
//! ```ignore
//! use mediacleaner_core::process::{Process, ProcessConfig, Root};
//!
//! let roots = vec![Root::new(Arc::new(OsFileSystem::new("/media")?), "/media")];
//! let process = Process::start(ProcessConfig::default().with_scan(true), roots, factory);
//!
//! tokio::signal::ctrl_c().await?;
//! process.kill().await?;
//! process.wait().await;
//! ```

mod config;
mod error;
mod job;
mod orchestrator;
mod types;
mod walker;
mod watcher;

pub use config::ProcessConfig;
pub use error::{BoxError, JobError, ProcessError};
pub use job::{Job, JobFactory, Root};
pub use orchestrator::Process;
pub use types::{ProcessState, ProcessSummary};
pub use walker::{walk, JobSink};
pub use watcher::watch;

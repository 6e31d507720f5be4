//! Mock job for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::process::{Job, JobError};

/// Shared, ordered record of the phases mock jobs ran.
///
/// Entries look like `check /a.jpg` and `execute /a.jpg`.
#[derive(Debug, Clone, Default)]
pub struct JobLog {
    entries: Arc<RwLock<Vec<String>>>,
}

impl JobLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries so far.
    pub async fn entries(&self) -> Vec<String> {
        self.entries.read().await.clone()
    }

    /// Names of jobs whose execute phase ran, in order.
    pub async fn executed(&self) -> Vec<String> {
        self.entries
            .read()
            .await
            .iter()
            .filter_map(|e| e.strip_prefix("execute ").map(str::to_string))
            .collect()
    }

    async fn push(&self, entry: String) {
        self.entries.write().await.push(entry);
    }
}

#[derive(Debug, Clone)]
enum CheckOutcome {
    Pass,
    Fail,
    Error,
}

/// Mock implementation of the Job trait.
///
/// Succeeds by default; each phase can be configured to fail.
#[derive(Debug, Clone)]
pub struct MockJob {
    name: String,
    check: CheckOutcome,
    execute_stage: Option<String>,
    log: Option<JobLog>,
}

impl MockJob {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            check: CheckOutcome::Pass,
            execute_stage: None,
            log: None,
        }
    }

    /// Make the check phase report an expected check failure.
    pub fn fail_check(mut self) -> Self {
        self.check = CheckOutcome::Fail;
        self
    }

    /// Make the check phase report an unexpected error.
    pub fn error_check(mut self) -> Self {
        self.check = CheckOutcome::Error;
        self
    }

    /// Make the execute phase fail with the given stage label.
    pub fn fail_execute(mut self, stage: impl Into<String>) -> Self {
        self.execute_stage = Some(stage.into());
        self
    }

    /// Record phases into `log`.
    pub fn with_log(mut self, log: JobLog) -> Self {
        self.log = Some(log);
        self
    }
}

#[async_trait]
impl Job for MockJob {
    fn name(&self) -> String {
        self.name.clone()
    }

    async fn check(&mut self) -> Result<(), JobError> {
        if let Some(log) = &self.log {
            log.push(format!("check {}", self.name)).await;
        }
        match self.check {
            CheckOutcome::Pass => Ok(()),
            CheckOutcome::Fail => Err(JobError::check("mock check failure")),
            CheckOutcome::Error => Err(JobError::unexpected("mock check error")),
        }
    }

    async fn execute(&mut self) -> Result<(), JobError> {
        if let Some(log) = &self.log {
            log.push(format!("execute {}", self.name)).await;
        }
        match &self.execute_stage {
            Some(stage) => Err(JobError::execute(stage.clone(), "mock execute failure")),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_job_records_phases() {
        let log = JobLog::new();
        let mut job = MockJob::new("/a.jpg").with_log(log.clone());
        job.check().await.unwrap();
        job.execute().await.unwrap();
        assert_eq!(log.entries().await, vec!["check /a.jpg", "execute /a.jpg"]);
        assert_eq!(log.executed().await, vec!["/a.jpg"]);
    }

    #[tokio::test]
    async fn test_mock_job_failures() {
        let mut job = MockJob::new("/a.jpg").fail_check();
        assert!(job.check().await.unwrap_err().is_check_failure());

        let mut job = MockJob::new("/a.jpg").fail_execute("failed to rename");
        let err = job.execute().await.unwrap_err();
        assert_eq!(err.stage(), Some("failed to rename"));
    }
}

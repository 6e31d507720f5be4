//! Transcodes organized videos to mp4.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

use crate::converter::{ConversionJob, ConversionProgress, Converter, VideoConstraints};
use crate::fs::FileSystem;
use crate::naming::layout;
use crate::process::{Job, JobError, JobFactory};

use super::error::CheckFailure;

/// A converter bundled with its settings and an optional progress listener.
#[derive(Clone)]
pub struct Transcoder {
    converter: Arc<dyn Converter>,
    constraints: VideoConstraints,
    progress: Option<mpsc::Sender<ConversionProgress>>,
}

impl Transcoder {
    pub fn new(converter: Arc<dyn Converter>, constraints: VideoConstraints) -> Self {
        Self {
            converter,
            constraints,
            progress: None,
        }
    }

    /// Forward conversion progress to `tx`.
    pub fn with_progress(mut self, tx: mpsc::Sender<ConversionProgress>) -> Self {
        self.progress = Some(tx);
        self
    }

    /// Whether `filename` still needs converting.
    ///
    /// Returns the check failure that explains why not, if it does not.
    pub(crate) async fn needs_transcode(
        &self,
        fs: &dyn FileSystem,
        filename: &Path,
    ) -> Result<(), JobError> {
        if layout::lowercase_extension(filename) == ".mp4" {
            return Err(JobError::check(CheckFailure::AlreadyMp4));
        }
        match self.converter.is_video(&fs.host_path(filename)).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(JobError::check(CheckFailure::NotVideo)),
            Err(e) => Err(JobError::unexpected(e)),
        }
    }

    /// Converts `filename` into an mp4 next to it, then removes the source.
    pub(crate) async fn run(
        &self,
        fs: &dyn FileSystem,
        filename: &Path,
    ) -> Result<PathBuf, JobError> {
        info!("Transcoding {:?}", filename);

        let input = fs.host_path(filename);
        let job = ConversionJob {
            job_id: filename.display().to_string(),
            output_path: input.with_extension("mp4"),
            input_path: input,
            constraints: self.constraints.clone(),
        };

        let result = match &self.progress {
            Some(tx) => self.converter.convert_with_progress(job, tx.clone()).await,
            None => self.converter.convert(job).await,
        };
        if let Err(e) = result {
            return Err(JobError::execute(
                format!("failed to transcode {:?}", filename),
                e,
            ));
        }

        fs.remove(filename)
            .await
            .map_err(|e| JobError::execute(format!("failed to remove {:?}", filename), e))?;

        Ok(filename.with_extension("mp4"))
    }
}

/// Converts a renamed video into an mp4 and removes the original.
pub struct TranscodeJob {
    fs: Arc<dyn FileSystem>,
    filename: PathBuf,
    transcoder: Transcoder,
}

impl TranscodeJob {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        filename: impl Into<PathBuf>,
        transcoder: Transcoder,
    ) -> Self {
        Self {
            fs,
            filename: filename.into(),
            transcoder,
        }
    }
}

#[async_trait]
impl Job for TranscodeJob {
    fn name(&self) -> String {
        self.filename.display().to_string()
    }

    async fn check(&mut self) -> Result<(), JobError> {
        // Only files already filed by the rename job
        if !layout::is_organized(&self.filename) {
            return Err(JobError::check(CheckFailure::NotRenamed));
        }
        self.transcoder
            .needs_transcode(self.fs.as_ref(), &self.filename)
            .await
    }

    async fn execute(&mut self) -> Result<(), JobError> {
        self.filename = self.transcoder.run(self.fs.as_ref(), &self.filename).await?;
        Ok(())
    }
}

/// Creates a [`TranscodeJob`] for every file.
pub struct TranscodeFactory {
    transcoder: Transcoder,
}

impl TranscodeFactory {
    pub fn new(transcoder: Transcoder) -> Self {
        Self { transcoder }
    }
}

impl JobFactory for TranscodeFactory {
    fn create(
        &self,
        fs: Arc<dyn FileSystem>,
        filename: &Path,
        _root: &Path,
    ) -> Option<Box<dyn Job>> {
        Some(Box::new(TranscodeJob::new(
            fs,
            filename,
            self.transcoder.clone(),
        )))
    }
}

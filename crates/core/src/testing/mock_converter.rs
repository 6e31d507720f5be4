//! Mock converter for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};

use super::MemoryFileSystem;
use crate::converter::{
    ConversionJob, ConversionProgress, ConversionResult, Converter, ConverterError, MediaInfo,
};

/// A recorded conversion job for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedConversion {
    /// The job that was submitted.
    pub job: ConversionJob,
    /// Whether the conversion succeeded.
    pub success: bool,
}

/// Mock implementation of the Converter trait.
///
/// Provides controllable behavior for testing:
/// - Track conversion jobs for assertions
/// - Simulate success/failure
/// - Control probe results
/// - Write the output into a [`MemoryFileSystem`]
///
/// Unless configured otherwise, files with a common video extension probe as
/// videos and everything else probes as a still image.
///
/// # Example
///
/// ```rust,ignore
/// use mediacleaner_core::testing::{MemoryFileSystem, MockConverter};
///
/// let fs = MemoryFileSystem::new();
/// let converter = MockConverter::new().with_output_fs(fs.clone());
///
/// converter.convert(job).await?;
/// assert!(fs.exists("/2012/06/2012_06_25_16:58:20_0000.mp4").await);
/// ```
#[derive(Debug, Default)]
pub struct MockConverter {
    /// Recorded conversions.
    conversions: Arc<RwLock<Vec<RecordedConversion>>>,
    /// Pre-configured probe results by path.
    probe_results: Arc<RwLock<HashMap<PathBuf, MediaInfo>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<ConverterError>>>,
    /// Simulated conversion duration.
    conversion_duration: Arc<RwLock<Duration>>,
    /// Filesystem that receives the converted output.
    output_fs: Option<MemoryFileSystem>,
}

impl MockConverter {
    /// Create a new mock converter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write successful conversions into `fs`.
    pub fn with_output_fs(mut self, fs: MemoryFileSystem) -> Self {
        self.output_fs = Some(fs);
        self
    }

    /// Get all recorded conversions.
    pub async fn recorded_conversions(&self) -> Vec<RecordedConversion> {
        self.conversions.read().await.clone()
    }

    /// Get the number of conversions performed.
    pub async fn conversion_count(&self) -> usize {
        self.conversions.read().await.len()
    }

    /// Set a probe result for a specific path.
    pub async fn set_probe_result(&self, path: impl AsRef<Path>, info: MediaInfo) {
        self.probe_results
            .write()
            .await
            .insert(path.as_ref().to_path_buf(), info);
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: ConverterError) {
        *self.next_error.write().await = Some(error);
    }

    /// Set the simulated conversion duration.
    pub async fn set_conversion_duration(&self, duration: Duration) {
        *self.conversion_duration.write().await = duration;
    }

    async fn take_error(&self) -> Option<ConverterError> {
        self.next_error.write().await.take()
    }

    /// Builds the MediaInfo a file with this name would probably have.
    pub fn media_info_for(path: &Path) -> MediaInfo {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let (format, video_codec, duration_secs) = match extension.as_str() {
            "mp4" | "mov" | "m4v" | "3gp" => ("mov", "h264", 12.0),
            "avi" => ("avi", "mpeg4", 12.0),
            "mkv" | "webm" => ("matroska", "vp9", 12.0),
            "mts" | "m2ts" => ("mpegts", "h264", 12.0),
            _ => ("image2", "mjpeg", 0.04),
        };

        MediaInfo {
            path: path.to_path_buf(),
            size_bytes: 1024,
            duration_secs,
            format: format.to_string(),
            audio_codec: (format != "image2").then(|| "aac".to_string()),
            video_codec: Some(video_codec.to_string()),
            video_width: Some(1920),
            video_height: Some(1080),
            video_fps: Some(30.0),
        }
    }
}

#[async_trait]
impl Converter for MockConverter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe(&self, path: &Path) -> Result<MediaInfo, ConverterError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        if let Some(info) = self.probe_results.read().await.get(path) {
            return Ok(info.clone());
        }

        Ok(Self::media_info_for(path))
    }

    async fn convert(&self, job: ConversionJob) -> Result<ConversionResult, ConverterError> {
        if let Some(err) = self.take_error().await {
            self.conversions.write().await.push(RecordedConversion {
                job,
                success: false,
            });
            return Err(err);
        }

        let duration = *self.conversion_duration.read().await;
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }

        if let Some(fs) = &self.output_fs {
            fs.add_file(&job.output_path, b"mp4").await;
        }

        self.conversions.write().await.push(RecordedConversion {
            job: job.clone(),
            success: true,
        });

        Ok(ConversionResult {
            input_format: Self::media_info_for(&job.input_path).format,
            job_id: job.job_id,
            output_path: job.output_path,
            output_size_bytes: 3,
            duration_ms: duration.as_millis() as u64,
        })
    }

    async fn convert_with_progress(
        &self,
        job: ConversionJob,
        progress_tx: mpsc::Sender<ConversionProgress>,
    ) -> Result<ConversionResult, ConverterError> {
        for percent in [50.0, 100.0] {
            let _ = progress_tx
                .send(ConversionProgress {
                    job_id: job.job_id.clone(),
                    percent,
                    time_secs: 6.0 * f64::from(percent) / 50.0,
                    duration_secs: Some(12.0),
                    speed: Some("10x".to_string()),
                })
                .await;
        }

        self.convert(job).await
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        match self.take_error().await {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::VideoConstraints;

    fn create_test_job(id: &str) -> ConversionJob {
        ConversionJob {
            job_id: id.to_string(),
            input_path: PathBuf::from("/2012/06/clip.avi"),
            output_path: PathBuf::from("/2012/06/clip.mp4"),
            constraints: VideoConstraints::default(),
        }
    }

    #[tokio::test]
    async fn test_default_probe_by_extension() {
        let converter = MockConverter::new();

        assert!(converter.is_video(Path::new("/a/clip.MOV")).await.unwrap());
        assert!(converter.is_video(Path::new("/a/clip.avi")).await.unwrap());
        assert!(!converter.is_video(Path::new("/a/photo.jpg")).await.unwrap());
    }

    #[tokio::test]
    async fn test_custom_probe_result() {
        let converter = MockConverter::new();
        let mut info = MockConverter::media_info_for(Path::new("/a/odd.bin"));
        info.format = "mov".to_string();
        info.duration_secs = 3.0;
        converter.set_probe_result("/a/odd.bin", info).await;

        assert!(converter.is_video(Path::new("/a/odd.bin")).await.unwrap());
    }

    #[tokio::test]
    async fn test_conversion_writes_output() {
        let fs = MemoryFileSystem::new();
        fs.add_dir("/2012/06").await;
        let converter = MockConverter::new().with_output_fs(fs.clone());

        let result = converter.convert(create_test_job("clip.avi")).await.unwrap();

        assert_eq!(result.job_id, "clip.avi");
        assert_eq!(result.input_format, "avi");
        assert!(fs.exists("/2012/06/clip.mp4").await);
        assert_eq!(converter.conversion_count().await, 1);
    }

    #[tokio::test]
    async fn test_error_injection() {
        let converter = MockConverter::new();
        converter
            .set_next_error(ConverterError::conversion_failed("test error", None))
            .await;

        assert!(converter.convert(create_test_job("fail")).await.is_err());

        let conversions = converter.recorded_conversions().await;
        assert_eq!(conversions.len(), 1);
        assert!(!conversions[0].success);

        converter.convert(create_test_job("ok")).await.unwrap();
        assert!(converter.recorded_conversions().await[1].success);
    }

    #[tokio::test]
    async fn test_missing_tool_is_an_error_for_is_video() {
        let converter = MockConverter::new();
        converter
            .set_next_error(ConverterError::FfprobeNotFound {
                path: PathBuf::from("ffprobe"),
            })
            .await;
        assert!(converter.is_video(Path::new("/a/clip.mov")).await.is_err());

        converter
            .set_next_error(ConverterError::probe_failed("corrupt"))
            .await;
        assert!(!converter.is_video(Path::new("/a/clip.mov")).await.unwrap());
    }

    #[tokio::test]
    async fn test_progress_updates() {
        let converter = MockConverter::new();
        let (tx, mut rx) = mpsc::channel(8);

        converter
            .convert_with_progress(create_test_job("clip.avi"), tx)
            .await
            .unwrap();

        let first = rx.recv().await.unwrap();
        let last = rx.recv().await.unwrap();
        assert_eq!(first.percent, 50.0);
        assert_eq!(last.percent, 100.0);
    }
}

//! FFmpeg-based converter implementation.

use async_trait::async_trait;
use regex_lite::Regex;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

use super::config::ConverterConfig;
use super::error::ConverterError;
use super::traits::Converter;
use super::types::{
    AudioCodec, ConversionJob, ConversionProgress, ConversionResult, MediaInfo, VideoConstraints,
};

/// Minimum gap between two progress updates.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// FFmpeg-based converter producing MP4 files.
pub struct FfmpegConverter {
    config: ConverterConfig,
}

/// Accumulates the `key=value` lines ffmpeg writes with `-progress`.
struct ProgressParser {
    time_re: Option<Regex>,
    speed_re: Option<Regex>,
    time_secs: f64,
    speed: Option<String>,
}

impl ProgressParser {
    fn new() -> Self {
        Self {
            time_re: Regex::new(r"out_time_ms=(\d+)").ok(),
            speed_re: Regex::new(r"speed=\s*(\d+\.?\d*)x").ok(),
            time_secs: 0.0,
            speed: None,
        }
    }

    fn feed(&mut self, line: &str) {
        if let Some(caps) = self.time_re.as_ref().and_then(|re| re.captures(line)) {
            // out_time_ms is in microseconds despite the name
            if let Ok(us) = caps[1].parse::<f64>() {
                self.time_secs = us / 1_000_000.0;
            }
        }
        if let Some(caps) = self.speed_re.as_ref().and_then(|re| re.captures(line)) {
            self.speed = Some(format!("{}x", &caps[1]));
        }
    }

    fn snapshot(&self, job_id: &str, duration_secs: Option<f64>) -> ConversionProgress {
        let percent = match duration_secs {
            Some(d) if d > 0.0 => (self.time_secs / d * 100.0).min(100.0) as f32,
            _ => 0.0,
        };
        ConversionProgress {
            job_id: job_id.to_string(),
            percent,
            time_secs: self.time_secs,
            duration_secs,
            speed: self.speed.clone(),
        }
    }
}

impl FfmpegConverter {
    /// Creates a new FFmpeg converter with the given configuration.
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    /// Creates a converter with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ConverterConfig::default())
    }

    /// Encoding settings from the configuration.
    pub fn constraints(&self) -> &VideoConstraints {
        &self.config.video
    }

    /// Builds ffmpeg arguments for an MP4 transcode.
    fn build_args(
        &self,
        input_path: &Path,
        output_path: &Path,
        constraints: &VideoConstraints,
    ) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-i".to_string(),
            input_path.to_string_lossy().to_string(),
            "-map_metadata".to_string(),
            "0".to_string(),
            "-c:v".to_string(),
            constraints.codec.ffmpeg_codec().to_string(),
            "-crf".to_string(),
            constraints.crf.to_string(),
            "-preset".to_string(),
            constraints.preset.clone(),
            "-pix_fmt".to_string(),
            constraints.pixel_format.clone(),
            "-c:a".to_string(),
            constraints.audio_codec.ffmpeg_codec().to_string(),
        ];

        if constraints.audio_codec != AudioCodec::Copy {
            args.extend([
                "-b:a".to_string(),
                format!("{}k", constraints.audio_bitrate_kbps),
            ]);
        }

        // Index up front so playback can start before the download ends
        args.extend([
            "-movflags".to_string(),
            "+faststart".to_string(),
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
            "-progress".to_string(),
            "pipe:2".to_string(),
        ]);

        args.extend(self.config.extra_ffmpeg_args.iter().cloned());
        args.push(output_path.to_string_lossy().to_string());
        args
    }

    /// Parses ffprobe JSON output into MediaInfo.
    fn parse_probe_output(path: &Path, output: &str) -> Result<MediaInfo, ConverterError> {
        #[derive(Deserialize)]
        struct ProbeOutput {
            format: ProbeFormat,
            #[serde(default)]
            streams: Vec<ProbeStream>,
        }

        #[derive(Deserialize)]
        struct ProbeFormat {
            format_name: String,
            duration: Option<String>,
            size: Option<String>,
        }

        #[derive(Deserialize)]
        struct ProbeStream {
            codec_type: String,
            codec_name: Option<String>,
            width: Option<u32>,
            height: Option<u32>,
            r_frame_rate: Option<String>,
        }

        let probe: ProbeOutput =
            serde_json::from_str(output).map_err(|e| ConverterError::ParseError {
                reason: format!("Failed to parse ffprobe output: {}", e),
            })?;

        let parse_num = |s: &Option<String>| s.as_deref().and_then(|v| v.parse::<f64>().ok());

        let audio = probe.streams.iter().find(|s| s.codec_type == "audio");
        let video = probe.streams.iter().find(|s| s.codec_type == "video");

        let format = probe
            .format
            .format_name
            .split(',')
            .next()
            .unwrap_or("unknown")
            .to_string();

        Ok(MediaInfo {
            path: path.to_path_buf(),
            size_bytes: parse_num(&probe.format.size).unwrap_or(0.0) as u64,
            duration_secs: parse_num(&probe.format.duration).unwrap_or(0.0),
            format,
            audio_codec: audio.and_then(|s| s.codec_name.clone()),
            video_codec: video.and_then(|s| s.codec_name.clone()),
            video_width: video.and_then(|s| s.width),
            video_height: video.and_then(|s| s.height),
            video_fps: video
                .and_then(|s| s.r_frame_rate.as_deref())
                .and_then(parse_frame_rate),
        })
    }

    fn spawn_error(&self, e: std::io::Error) -> ConverterError {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConverterError::FfmpegNotFound {
                path: self.config.ffmpeg_path.clone(),
            }
        } else {
            ConverterError::Io(e)
        }
    }

    /// Runs the conversion with optional progress reporting.
    async fn run_conversion(
        &self,
        job: &ConversionJob,
        progress_tx: Option<mpsc::Sender<ConversionProgress>>,
    ) -> Result<ConversionResult, ConverterError> {
        let start = Instant::now();

        let input_info = self.probe(&job.input_path).await?;
        let duration_secs = Some(input_info.duration_secs);

        let args = self.build_args(&job.input_path, &job.output_path, &job.constraints);
        tracing::debug!(job_id = %job.job_id, ?args, "Starting ffmpeg");

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ConverterError::conversion_failed("ffmpeg stderr not captured", None))?;
        let mut lines = BufReader::new(stderr).lines();
        let mut parser = ProgressParser::new();

        let run = async {
            let mut last_sent = Instant::now();
            let mut error_output = String::new();

            while let Some(line) = lines.next_line().await? {
                if line.to_ascii_lowercase().contains("error") {
                    error_output.push_str(&line);
                    error_output.push('\n');
                }
                parser.feed(&line);

                if let Some(tx) = &progress_tx {
                    if last_sent.elapsed() >= PROGRESS_INTERVAL {
                        // A slow listener never holds up the encode
                        let _ = tx.try_send(parser.snapshot(&job.job_id, duration_secs));
                        last_sent = Instant::now();
                    }
                }
            }

            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, error_output))
        };

        let outcome = timeout(Duration::from_secs(self.config.timeout_secs), run).await;
        let (status, error_output) = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                let _ = child.kill().await;
                discard_partial_output(&job.output_path).await;
                return Err(e.into());
            }
            Err(_) => {
                let _ = child.kill().await;
                discard_partial_output(&job.output_path).await;
                return Err(ConverterError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                });
            }
        };

        if !status.success() {
            discard_partial_output(&job.output_path).await;
            return Err(ConverterError::conversion_failed(
                format!("FFmpeg exited with code: {:?}", status.code()),
                (!error_output.is_empty()).then_some(error_output),
            ));
        }

        if let Some(tx) = &progress_tx {
            let mut done = parser.snapshot(&job.job_id, duration_secs);
            done.percent = 100.0;
            let _ = tx.try_send(done);
        }

        let output_meta = tokio::fs::metadata(&job.output_path)
            .await
            .map_err(|_| ConverterError::conversion_failed("Output file not created", None))?;

        Ok(ConversionResult {
            job_id: job.job_id.clone(),
            output_path: job.output_path.clone(),
            output_size_bytes: output_meta.len(),
            duration_ms: start.elapsed().as_millis() as u64,
            input_format: input_info.format,
        })
    }
}

/// Removes whatever ffmpeg wrote before failing, so no half-written mp4
/// is left under a canonical name.
async fn discard_partial_output(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(?path, "Removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(?path, error = %e, "Failed to remove partial output"),
    }
}

/// Parses a frame rate like "30000/1001" or "25".
fn parse_frame_rate(rate: &str) -> Option<f32> {
    match rate.split_once('/') {
        Some((num, den)) => {
            let num = num.parse::<f32>().ok()?;
            let den = den.parse::<f32>().ok()?;
            (den > 0.0).then(|| num / den)
        }
        None => rate.parse::<f32>().ok(),
    }
}

#[async_trait]
impl Converter for FfmpegConverter {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn probe(&self, path: &Path) -> Result<MediaInfo, ConverterError> {
        if tokio::fs::metadata(path).await.is_err() {
            return Err(ConverterError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let output = Command::new(&self.config.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConverterError::FfprobeNotFound {
                        path: self.config.ffprobe_path.clone(),
                    }
                } else {
                    ConverterError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(ConverterError::probe_failed(format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        Self::parse_probe_output(path, &String::from_utf8_lossy(&output.stdout))
    }

    async fn convert(&self, job: ConversionJob) -> Result<ConversionResult, ConverterError> {
        self.run_conversion(&job, None).await
    }

    async fn convert_with_progress(
        &self,
        job: ConversionJob,
        progress_tx: mpsc::Sender<ConversionProgress>,
    ) -> Result<ConversionResult, ConverterError> {
        self.run_conversion(&job, Some(progress_tx)).await
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        Command::new(&self.config.ffprobe_path)
            .arg("-version")
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConverterError::FfprobeNotFound {
                        path: self.config.ffprobe_path.clone(),
                    }
                } else {
                    ConverterError::Io(e)
                }
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::VideoCodec;

    fn position(args: &[String], flag: &str) -> Option<String> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1).cloned())
    }

    #[test]
    fn test_build_args_defaults() {
        let converter = FfmpegConverter::with_defaults();
        let args = converter.build_args(
            Path::new("/media/2012/06/clip.avi"),
            Path::new("/media/2012/06/clip.mp4"),
            converter.constraints(),
        );

        assert_eq!(position(&args, "-i").as_deref(), Some("/media/2012/06/clip.avi"));
        assert_eq!(position(&args, "-c:v").as_deref(), Some("libx264"));
        assert_eq!(position(&args, "-pix_fmt").as_deref(), Some("yuv420p"));
        assert_eq!(position(&args, "-c:a").as_deref(), Some("aac"));
        assert_eq!(position(&args, "-b:a").as_deref(), Some("192k"));
        assert_eq!(position(&args, "-movflags").as_deref(), Some("+faststart"));
        assert_eq!(position(&args, "-progress").as_deref(), Some("pipe:2"));
        assert_eq!(args.last().map(String::as_str), Some("/media/2012/06/clip.mp4"));
    }

    #[test]
    fn test_build_args_copy_audio_has_no_bitrate() {
        let converter = FfmpegConverter::with_defaults();
        let constraints = VideoConstraints {
            codec: VideoCodec::H265,
            audio_codec: AudioCodec::Copy,
            crf: 28,
            ..Default::default()
        };
        let args = converter.build_args(Path::new("/a.mov"), Path::new("/a.mp4"), &constraints);

        assert_eq!(position(&args, "-c:v").as_deref(), Some("libx265"));
        assert_eq!(position(&args, "-crf").as_deref(), Some("28"));
        assert_eq!(position(&args, "-c:a").as_deref(), Some("copy"));
        assert!(!args.contains(&"-b:a".to_string()));
    }

    #[test]
    fn test_parse_probe_output_video() {
        let json = r#"{
            "format": {
                "filename": "clip.mov",
                "format_name": "mov,mp4,m4a,3gp,3g2,mj2",
                "duration": "12.345",
                "size": "5000000"
            },
            "streams": [
                {
                    "codec_type": "video",
                    "codec_name": "h264",
                    "width": 1920,
                    "height": 1080,
                    "r_frame_rate": "30000/1001"
                },
                {
                    "codec_type": "audio",
                    "codec_name": "aac"
                }
            ]
        }"#;

        let info = FfmpegConverter::parse_probe_output(Path::new("clip.mov"), json).unwrap();
        assert_eq!(info.format, "mov");
        assert_eq!(info.size_bytes, 5_000_000);
        assert_eq!(info.video_codec.as_deref(), Some("h264"));
        assert_eq!(info.audio_codec.as_deref(), Some("aac"));
        let fps = info.video_fps.unwrap();
        assert!((fps - 29.97).abs() < 0.01);
        assert!(info.is_video());
    }

    #[test]
    fn test_parse_probe_output_still_image() {
        let json = r#"{
            "format": {"format_name": "image2", "duration": "0.040000", "size": "2000"},
            "streams": [{"codec_type": "video", "codec_name": "mjpeg", "width": 640, "height": 480}]
        }"#;

        let info = FfmpegConverter::parse_probe_output(Path::new("a.jpg"), json).unwrap();
        assert!(!info.is_video());
    }

    #[test]
    fn test_parse_probe_output_garbage() {
        let err = FfmpegConverter::parse_probe_output(Path::new("a"), "{}").unwrap_err();
        assert!(matches!(err, ConverterError::ParseError { .. }));
    }

    #[test]
    fn test_progress_parser() {
        let mut parser = ProgressParser::new();
        parser.feed("frame=120");
        parser.feed("out_time_ms=5000000");
        parser.feed("speed=1.50x");

        let progress = parser.snapshot("clip", Some(10.0));
        assert_eq!(progress.job_id, "clip");
        assert!((progress.time_secs - 5.0).abs() < f64::EPSILON);
        assert!((progress.percent - 50.0).abs() < 0.01);
        assert_eq!(progress.speed.as_deref(), Some("1.50x"));

        let unknown = parser.snapshot("clip", None);
        assert_eq!(unknown.percent, 0.0);
    }

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("25"), Some(25.0));
        assert_eq!(parse_frame_rate("30/1"), Some(30.0));
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("abc"), None);
    }

    #[tokio::test]
    async fn test_probe_missing_input() {
        let converter = FfmpegConverter::with_defaults();
        let err = converter
            .probe(Path::new("/nonexistent/clip.mov"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConverterError::InputNotFound { .. }));
    }

    #[tokio::test]
    async fn test_discard_partial_output() {
        let dir = tempfile::TempDir::new().unwrap();
        let partial = dir.path().join("2012_06_25_16:58:20_0000.mp4");
        tokio::fs::write(&partial, b"half").await.unwrap();

        discard_partial_output(&partial).await;
        assert!(!partial.exists());

        // Nothing written is not an error
        discard_partial_output(&partial).await;
    }

    #[tokio::test]
    async fn test_validate_missing_binary() {
        let converter = FfmpegConverter::new(ConverterConfig::with_paths(
            "/nonexistent/ffmpeg".into(),
            "/nonexistent/ffprobe".into(),
        ));
        let err = converter.validate().await.unwrap_err();
        assert!(matches!(err, ConverterError::FfmpegNotFound { .. }));
    }
}

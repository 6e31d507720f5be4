//! Types for the converter module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Video codec of the transcoded output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoCodec {
    /// H.264 / AVC
    H264,
    /// H.265 / HEVC
    H265,
}

impl VideoCodec {
    /// Returns the ffmpeg encoder name for this codec.
    pub fn ffmpeg_codec(&self) -> &'static str {
        match self {
            Self::H264 => "libx264",
            Self::H265 => "libx265",
        }
    }
}

/// Audio codec of the transcoded output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioCodec {
    /// Advanced Audio Coding
    Aac,
    /// Keep the source audio stream
    Copy,
}

impl AudioCodec {
    /// Returns the ffmpeg encoder name for this codec.
    pub fn ffmpeg_codec(&self) -> &'static str {
        match self {
            Self::Aac => "aac",
            Self::Copy => "copy",
        }
    }
}

/// Encoding settings for the MP4 output.
///
/// The defaults produce H.264/AAC in yuv420p with the index at the front of
/// the file, which plays on practically every device and browser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoConstraints {
    /// Target video codec.
    #[serde(default = "default_video_codec")]
    pub codec: VideoCodec,
    /// Constant Rate Factor (quality, lower = better, 0-51 for x264/x265).
    #[serde(default = "default_crf")]
    pub crf: u8,
    /// Encoder speed preset (ultrafast .. veryslow).
    #[serde(default = "default_preset")]
    pub preset: String,
    /// Output pixel format.
    #[serde(default = "default_pixel_format")]
    pub pixel_format: String,
    /// Target audio codec.
    #[serde(default = "default_audio_codec")]
    pub audio_codec: AudioCodec,
    /// Target audio bitrate in kbps (ignored when copying audio).
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate_kbps: u32,
}

fn default_video_codec() -> VideoCodec {
    VideoCodec::H264
}

fn default_crf() -> u8 {
    23
}

fn default_preset() -> String {
    "medium".to_string()
}

fn default_pixel_format() -> String {
    "yuv420p".to_string()
}

fn default_audio_codec() -> AudioCodec {
    AudioCodec::Aac
}

fn default_audio_bitrate() -> u32 {
    192
}

impl Default for VideoConstraints {
    fn default() -> Self {
        Self {
            codec: default_video_codec(),
            crf: default_crf(),
            preset: default_preset(),
            pixel_format: default_pixel_format(),
            audio_codec: default_audio_codec(),
            audio_bitrate_kbps: default_audio_bitrate(),
        }
    }
}

/// A conversion job request.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    /// Identifies the job in progress updates, usually the source name.
    pub job_id: String,
    /// Input file path (host path).
    pub input_path: PathBuf,
    /// Output file path (host path).
    pub output_path: PathBuf,
    /// Encoding settings.
    pub constraints: VideoConstraints,
}

/// Result of a successful conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionResult {
    /// Job ID.
    pub job_id: String,
    /// Output file path.
    pub output_path: PathBuf,
    /// Output file size in bytes.
    pub output_size_bytes: u64,
    /// Conversion duration in milliseconds.
    pub duration_ms: u64,
    /// Detected input container format.
    pub input_format: String,
}

/// Container formats ffprobe reports for still images.
const IMAGE_FORMATS: &[&str] = &["image2", "gif", "apng", "tiff_pipe"];

/// Information about a media file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    /// File path.
    pub path: PathBuf,
    /// File size in bytes.
    pub size_bytes: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// Container format (e.g., "mov", "matroska").
    pub format: String,
    /// Audio codec (if present).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_codec: Option<String>,
    /// Video codec (if present).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_codec: Option<String>,
    /// Video width (if present).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_width: Option<u32>,
    /// Video height (if present).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_height: Option<u32>,
    /// Video frame rate (if present).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_fps: Option<f32>,
}

impl MediaInfo {
    /// Whether the file holds moving pictures rather than a still image.
    pub fn is_video(&self) -> bool {
        self.video_codec.is_some()
            && self.duration_secs > 0.0
            && !IMAGE_FORMATS.contains(&self.format.as_str())
            && !self.format.ends_with("_pipe")
    }
}

/// Progress update during conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionProgress {
    /// Job ID.
    pub job_id: String,
    /// Progress percentage (0.0 - 100.0).
    pub percent: f32,
    /// Current processing time in seconds.
    pub time_secs: f64,
    /// Estimated total duration in seconds.
    pub duration_secs: Option<f64>,
    /// Current processing speed (e.g., "1.5x").
    pub speed: Option<String>,
}

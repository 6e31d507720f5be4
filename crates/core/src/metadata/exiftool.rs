//! exiftool-based metadata extractor.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde_json::Value;
use std::path::Path;
use tokio::process::Command;
use tokio::time::{timeout, Duration};

use super::config::ExifToolConfig;
use super::error::MetadataError;
use super::traits::MetadataExtractor;

/// Date layout requested from exiftool with `-d`.
const EXIF_DATE_LAYOUT: &str = "%Y:%m:%d %H:%M:%S";

/// Extracts capture dates by running `exiftool -j`.
pub struct ExifTool {
    config: ExifToolConfig,
}

impl ExifTool {
    /// Creates a new extractor with the given configuration.
    pub fn new(config: ExifToolConfig) -> Self {
        Self { config }
    }

    /// Creates an extractor with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ExifToolConfig::default())
    }

    fn build_args(&self, path: &Path) -> Vec<String> {
        let mut args = vec![
            "-j".to_string(),
            "-d".to_string(),
            EXIF_DATE_LAYOUT.to_string(),
        ];
        args.extend(self.config.date_tags.iter().map(|t| format!("-{}", t)));
        args.push(path.to_string_lossy().to_string());
        args
    }

    /// Picks the first usable date out of exiftool's JSON output.
    fn parse_output(&self, output: &str) -> Result<NaiveDateTime, MetadataError> {
        let parsed: Value = serde_json::from_str(output)
            .map_err(|e| MetadataError::unreadable(format!("invalid exiftool output: {}", e)))?;

        let record = parsed
            .as_array()
            .and_then(|records| records.first())
            .ok_or_else(|| MetadataError::unreadable("exiftool returned no records"))?;

        self.config
            .date_tags
            .iter()
            .filter_map(|tag| record.get(tag).and_then(Value::as_str))
            // Cameras without a clock write all zeroes
            .find_map(|value| NaiveDateTime::parse_from_str(value.trim(), EXIF_DATE_LAYOUT).ok())
            .ok_or(MetadataError::NoDate)
    }
}

#[async_trait]
impl MetadataExtractor for ExifTool {
    fn name(&self) -> &str {
        "exiftool"
    }

    async fn capture_date(&self, path: &Path) -> Result<NaiveDateTime, MetadataError> {
        let mut command = Command::new(&self.config.exiftool_path);
        command.args(self.build_args(path)).kill_on_drop(true);

        let output = timeout(Duration::from_secs(self.config.timeout_secs), command.output())
            .await
            .map_err(|_| MetadataError::Timeout {
                timeout_secs: self.config.timeout_secs,
            })?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    MetadataError::ToolNotFound {
                        path: self.config.exiftool_path.clone(),
                    }
                } else {
                    MetadataError::Io(e)
                }
            })?;

        // exiftool still prints a record for files it reads partially
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() && stdout.trim().is_empty() {
            return Err(MetadataError::unreadable(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        self.parse_output(&stdout)
    }
}

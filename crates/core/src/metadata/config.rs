//! Configuration for the metadata module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the exiftool-based extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExifToolConfig {
    /// Path to exiftool binary.
    #[serde(default = "default_exiftool_path")]
    pub exiftool_path: PathBuf,

    /// Timeout for a single extraction in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Tags to read, in order of preference.
    #[serde(default = "default_date_tags")]
    pub date_tags: Vec<String>,
}

fn default_exiftool_path() -> PathBuf {
    PathBuf::from("exiftool")
}

fn default_timeout() -> u64 {
    30
}

fn default_date_tags() -> Vec<String> {
    ["DateTimeOriginal", "CreateDate", "MediaCreateDate", "TrackCreateDate"]
        .iter()
        .map(|t| t.to_string())
        .collect()
}

impl Default for ExifToolConfig {
    fn default() -> Self {
        Self {
            exiftool_path: default_exiftool_path(),
            timeout_secs: default_timeout(),
            date_tags: default_date_tags(),
        }
    }
}

impl ExifToolConfig {
    /// Sets the exiftool binary path.
    pub fn with_path(mut self, path: PathBuf) -> Self {
        self.exiftool_path = path;
        self
    }

    /// Sets the timeout in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

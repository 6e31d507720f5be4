//! Configuration for the concrete jobs.

use serde::{Deserialize, Serialize};

/// Settings of the rename job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameConfig {
    /// File into `/YYYY/MM/DD` instead of `/YYYY/MM`.
    #[serde(default)]
    pub day_dirs: bool,

    /// Transcode renamed videos to mp4 right after moving them.
    #[serde(default)]
    pub transcode_videos: bool,
}

impl RenameConfig {
    /// Enables per-day directories.
    pub fn with_day_dirs(mut self, day_dirs: bool) -> Self {
        self.day_dirs = day_dirs;
        self
    }

    /// Enables transcoding after rename.
    pub fn with_transcode_videos(mut self, transcode_videos: bool) -> Self {
        self.transcode_videos = transcode_videos;
        self
    }
}

/// What to do with a file whose contents were already seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupMode {
    /// Move it into `<original>-duplicates/`.
    #[default]
    Relocate,
    /// Delete it.
    Remove,
}

/// Settings of the dedup job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupConfig {
    #[serde(default)]
    pub mode: DedupMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let rename = RenameConfig::default();
        assert!(!rename.day_dirs);
        assert!(!rename.transcode_videos);
        assert_eq!(DedupConfig::default().mode, DedupMode::Relocate);
    }

    #[test]
    fn test_deserialize() {
        let dedup: DedupConfig = toml::from_str("mode = \"remove\"").unwrap();
        assert_eq!(dedup.mode, DedupMode::Remove);

        let rename: RenameConfig = toml::from_str("day_dirs = true").unwrap();
        assert!(rename.day_dirs);
        assert!(!rename.transcode_videos);
    }
}

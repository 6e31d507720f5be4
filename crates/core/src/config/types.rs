use serde::{Deserialize, Serialize};

use crate::converter::ConverterConfig;
use crate::jobs::{DedupConfig, RenameConfig};
use crate::metadata::ExifToolConfig;
use crate::process::ProcessConfig;

/// Root configuration
///
/// Every section is optional; a missing section takes its defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub process: ProcessConfig,
    #[serde(default)]
    pub rename: RenameConfig,
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub exiftool: ExifToolConfig,
}

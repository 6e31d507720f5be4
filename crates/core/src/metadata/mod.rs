//! Capture-date extraction from embedded metadata.
//!
//! Used as a fallback when a file name carries no recognisable date.
//! [`ExifTool`] shells out to the `exiftool` binary.

mod config;
mod error;
mod exiftool;
mod traits;

pub use config::ExifToolConfig;
pub use error::MetadataError;
pub use exiftool::ExifTool;
pub use traits::MetadataExtractor;

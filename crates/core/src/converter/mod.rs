//! Converter module for transcoding videos to MP4.
//!
//! This module provides the `Converter` trait and an FFmpeg implementation that
//! probes media files and re-encodes videos into an H.264/AAC MP4 that plays on
//! practically any device.
//!
//! # Example
//!
//! ```ignore
//! use mediacleaner_core::converter::{Converter, ConversionJob, FfmpegConverter};
//!
//! let converter = FfmpegConverter::with_defaults();
//! converter.validate().await?;
//!
//! if converter.is_video(Path::new("/media/2012/06/clip.avi")).await? {
//!     let job = ConversionJob {
//!         job_id: "clip.avi".to_string(),
//!         input_path: PathBuf::from("/media/2012/06/clip.avi"),
//!         output_path: PathBuf::from("/media/2012/06/clip.mp4"),
//!         constraints: converter.constraints().clone(),
//!     };
//!     let result = converter.convert(job).await?;
//!     println!("Converted in {} ms", result.duration_ms);
//! }
//! ```

mod config;
mod error;
mod ffmpeg;
mod traits;
mod types;

pub use config::ConverterConfig;
pub use error::ConverterError;
pub use ffmpeg::FfmpegConverter;
pub use traits::Converter;
pub use types::{
    AudioCodec, ConversionJob, ConversionProgress, ConversionResult, MediaInfo, VideoCodec,
    VideoConstraints,
};

//! Concrete jobs run by the process.
//!
//! - [`RenameJob`] files media into `/YYYY/MM[/DD]` under a name built from
//!   its capture time, optionally transcoding videos afterwards.
//! - [`TranscodeJob`] converts organized videos into mp4.
//! - [`DedupJob`] moves aside or deletes files whose contents were already
//!   seen.
//!
//! Each job comes with a [`JobFactory`](crate::process::JobFactory) that
//! decides which files and directories it applies to.

mod config;
mod dedup;
mod error;
mod rename;
mod transcode;

pub use config::{DedupConfig, DedupMode, RenameConfig};
pub use dedup::{DedupFactory, DedupJob, DigestIndex, DUPLICATES_SUFFIX};
pub use error::CheckFailure;
pub use rename::{RenameFactory, RenameJob};
pub use transcode::{TranscodeFactory, TranscodeJob, Transcoder};

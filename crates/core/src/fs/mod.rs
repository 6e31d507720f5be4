//! Filesystem abstraction used by producers and jobs.
//!
//! Every path handed to a [`FileSystem`] is relative to the root the
//! filesystem was opened on, written with a leading `/` (for example
//! `/2010/01/2010_01_01_10:00:00_0000.jpg`). This keeps the canonical
//! layout checks independent of where the library lives on disk.
//!
//! # Example
//!
//! ```ignore
//! use mediacleaner_core::fs::{FileSystem, OsFileSystem};
//!
//! let fs = OsFileSystem::new("/my/media")?;
//! let stat = fs.stat(Path::new("/IMG_20100101_100000.jpg")).await?;
//! assert!(!stat.is_dir);
//! ```

mod error;
mod glob;
mod os;
mod traits;
mod types;

pub use error::FsError;
pub use glob::{glob_matches, split_pattern};
pub use os::OsFileSystem;
pub use traits::{FileSystem, Watcher};
pub use types::{EventMask, FileStat, FsEvent};

//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the filesystem, job,
//! converter and metadata traits, allowing the process and the concrete jobs
//! to be tested without touching the disk or running external tools.
//!
//! # Example
//!
//! ```rust,ignore
//! use mediacleaner_core::testing::{MemoryFileSystem, MockExtractor};
//!
//! let fs = MemoryFileSystem::new();
//! fs.add_file("/DSC0001.jpg", b"jpeg").await;
//!
//! let extractor = MockExtractor::new();
//! extractor.set_date("/DSC0001.jpg", timestamp).await;
//! ```

mod memory_fs;
mod mock_converter;
mod mock_extractor;
mod mock_job;

pub use memory_fs::{FailOp, MemoryFileSystem};
pub use mock_converter::{MockConverter, RecordedConversion};
pub use mock_extractor::MockExtractor;
pub use mock_job::{JobLog, MockJob};

pub mod config;
pub mod converter;
pub mod fs;
pub mod jobs;
pub mod metadata;
pub mod naming;
pub mod process;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, load_default_config, validate_config, Config, ConfigError,
};
pub use fs::{FileSystem, FsError, OsFileSystem};
pub use naming::DateMatcher;
pub use process::{Job, JobError, JobFactory, Process, ProcessConfig, ProcessState, Root};

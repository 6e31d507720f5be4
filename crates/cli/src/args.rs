use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use mediacleaner_core::jobs::DedupMode;

/// mediacleaner - keeps a media library organized by capture date
#[derive(Parser, Debug)]
#[command(name = "mediacleaner")]
#[command(version)]
#[command(about = "Organize photos and videos by capture date", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML); defaults apply when omitted
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Only log warnings and errors, and hide progress bars
    #[arg(short = 'q', long = "quiet", global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Move files into /YYYY/MM named after their capture time
    Rename(RenameArgs),
    /// Convert organized videos to mp4
    Transcode(ProcessArgs),
    /// Move aside or delete files with identical contents
    Dedup(DedupArgs),
}

impl Command {
    pub fn process(&self) -> &ProcessArgs {
        match self {
            Self::Rename(args) => &args.process,
            Self::Transcode(args) => args,
            Self::Dedup(args) => &args.process,
        }
    }
}

/// How files are discovered; at least one is required.
#[derive(Args, Debug)]
#[group(required = true, multiple = true)]
pub struct Mode {
    /// Process every file under the directories once
    #[arg(short = 's', long = "scan")]
    pub scan: bool,

    /// Process files created under the directories until interrupted
    #[arg(short = 'w', long = "watch")]
    pub watch: bool,
}

#[derive(Args, Debug)]
pub struct ProcessArgs {
    #[command(flatten)]
    pub mode: Mode,

    /// Library directories
    #[arg(required = true)]
    pub dirs: Vec<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RenameArgs {
    #[command(flatten)]
    pub process: ProcessArgs,

    /// File into /YYYY/MM/DD instead of /YYYY/MM
    #[arg(long = "day-dirs")]
    pub day_dirs: bool,

    /// Convert renamed videos to mp4
    #[arg(short = 't', long = "transcode")]
    pub transcode: bool,
}

#[derive(Args, Debug)]
pub struct DedupArgs {
    #[command(flatten)]
    pub process: ProcessArgs,

    /// What to do with duplicates (default from configuration)
    #[arg(long = "mode", value_enum)]
    pub mode: Option<DedupModeArg>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DedupModeArg {
    /// Move into <original>-duplicates/
    Relocate,
    /// Delete
    Remove,
}

impl From<DedupModeArg> for DedupMode {
    fn from(arg: DedupModeArg) -> Self {
        match arg {
            DedupModeArg::Relocate => DedupMode::Relocate,
            DedupModeArg::Remove => DedupMode::Remove,
        }
    }
}

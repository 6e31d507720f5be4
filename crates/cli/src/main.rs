mod args;
mod progress;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mediacleaner_core::{
    converter::{ConversionProgress, Converter, FfmpegConverter},
    jobs::{DedupFactory, RenameFactory, TranscodeFactory, Transcoder},
    load_config, load_default_config,
    metadata::ExifTool,
    validate_config, Config, DateMatcher, JobFactory, OsFileSystem, Process, Root,
};

use args::{Cli, Command};

/// Buffer size for conversion progress updates
const PROGRESS_BUFFER_SIZE: usize = 64;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_filter = if cli.quiet { "warn" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            load_config(path)
                .with_context(|| format!("Failed to load config from {:?}", path))?
        }
        None => load_default_config().context("Failed to load default config")?,
    };
    apply_args(&mut config, &cli.command);
    validate_config(&config).context("Configuration validation failed")?;

    let roots = open_roots(&cli.command.process().dirs)?;

    let (progress_tx, progress_task) = if cli.quiet {
        (None, None)
    } else {
        let (tx, rx) = mpsc::channel(PROGRESS_BUFFER_SIZE);
        (Some(tx), Some(progress::spawn_progress(rx)))
    };

    let factory = build_factory(&cli.command, &config, progress_tx).await?;

    info!(
        "Starting {} (scan: {}, watch: {}) on {} director{}",
        command_name(&cli.command),
        config.process.scan,
        config.process.watch,
        roots.len(),
        if roots.len() == 1 { "y" } else { "ies" }
    );
    let process = Process::start(config.process.clone(), roots, factory);

    tokio::select! {
        _ = process.wait() => {}
        _ = shutdown_signal() => {
            info!("Shutting down, finishing queued files...");
            process.kill().await.context("Failed to stop processing")?;
            process.wait().await;
        }
    }

    finish_progress(progress_task).await;

    let summary = process.summary();
    info!(
        "Done: {} executed, {} skipped, {} failed",
        summary.executed,
        summary.skipped,
        summary.check_errors + summary.execute_errors
    );
    Ok(())
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Rename(_) => "rename",
        Command::Transcode(_) => "transcode",
        Command::Dedup(_) => "dedup",
    }
}

/// Command line flags take precedence over the configuration file.
fn apply_args(config: &mut Config, command: &Command) {
    let mode = &command.process().mode;
    config.process.scan = mode.scan;
    config.process.watch = mode.watch;

    match command {
        Command::Rename(args) => {
            config.rename.day_dirs |= args.day_dirs;
            config.rename.transcode_videos |= args.transcode;
        }
        Command::Dedup(args) => {
            if let Some(mode) = args.mode {
                config.dedup.mode = mode.into();
            }
        }
        Command::Transcode(_) => {}
    }
}

fn open_roots(dirs: &[PathBuf]) -> Result<Vec<Root>> {
    dirs.iter()
        .map(|dir| {
            let fs = OsFileSystem::new(dir)
                .with_context(|| format!("Cannot open directory {:?}", dir))?;
            Ok(Root::new(Arc::new(fs), dir.clone()))
        })
        .collect()
}

async fn build_transcoder(
    config: &Config,
    progress_tx: Option<mpsc::Sender<ConversionProgress>>,
) -> Result<Transcoder> {
    let converter = FfmpegConverter::new(config.converter.clone());
    converter
        .validate()
        .await
        .context("ffmpeg and ffprobe are required for transcoding")?;
    info!("Using converter: {}", converter.name());

    let transcoder = Transcoder::new(Arc::new(converter), config.converter.video.clone());
    Ok(match progress_tx {
        Some(tx) => transcoder.with_progress(tx),
        None => transcoder,
    })
}

async fn build_factory(
    command: &Command,
    config: &Config,
    progress_tx: Option<mpsc::Sender<ConversionProgress>>,
) -> Result<Arc<dyn JobFactory>> {
    let factory: Arc<dyn JobFactory> = match command {
        Command::Rename(_) => {
            let mut factory = RenameFactory::new(
                Arc::new(DateMatcher::new()),
                Arc::new(ExifTool::new(config.exiftool.clone())),
                config.rename.clone(),
            );
            if config.rename.transcode_videos {
                factory = factory.with_transcoder(build_transcoder(config, progress_tx).await?);
            }
            Arc::new(factory)
        }
        Command::Transcode(_) => Arc::new(TranscodeFactory::new(
            build_transcoder(config, progress_tx).await?,
        )),
        Command::Dedup(_) => {
            info!("Duplicates will be handled with mode {:?}", config.dedup.mode);
            Arc::new(DedupFactory::new(config.dedup.mode))
        }
    };
    Ok(factory)
}

async fn finish_progress(task: Option<JoinHandle<()>>) {
    if let Some(task) = task {
        // Senders live in the factory, which the stopped process has dropped
        if let Err(e) = task.await {
            warn!("Progress display failed: {}", e);
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediacleaner_core::jobs::DedupMode;

    #[test]
    fn test_apply_args() {
        let cli = Cli::try_parse_from([
            "mediacleaner",
            "rename",
            "-w",
            "--day-dirs",
            "-t",
            "/photos",
        ])
        .unwrap();
        let mut config = Config::default();
        apply_args(&mut config, &cli.command);

        assert!(!config.process.scan);
        assert!(config.process.watch);
        assert!(config.rename.day_dirs);
        assert!(config.rename.transcode_videos);
    }

    #[test]
    fn test_apply_args_keeps_configured_dedup_mode() {
        let cli = Cli::try_parse_from(["mediacleaner", "dedup", "-s", "/photos"]).unwrap();
        let mut config = Config::default();
        config.dedup.mode = DedupMode::Remove;
        apply_args(&mut config, &cli.command);
        assert_eq!(config.dedup.mode, DedupMode::Remove);
    }

    #[test]
    fn test_open_roots_rejects_missing_dir() {
        let result = open_roots(&[PathBuf::from("/nonexistent/library")]);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_dedup_factory_needs_no_tools() {
        let cli = Cli::try_parse_from(["mediacleaner", "dedup", "-s", "/photos"]).unwrap();
        let config = Config::default();
        let factory = build_factory(&cli.command, &config, None).await.unwrap();
        assert!(factory.skip_dir(std::path::Path::new("/a.jpg-duplicates")));
    }
}

//! Tile map snapshot service.
//!
//! Captures a rectangular region of a slippy tile map with:
//! - Concurrent tile downloads with retry and linear backoff
//! - All-or-nothing assembly (no partial snapshots)
//! - Crop to sub-tile pixel bounds and nearest-neighbor upscaling
//! - Date-bucketed PNG output and an archive organizer
//! - Daily timelapse GIFs linked from each day's README
//! - Periodic capture until Ctrl+C

mod archive;
mod config;
mod output;
mod scheduler;
mod timelapse;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use capture::SnapshotPipeline;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use mosaic_common::{BoundingBox, ScaleFactor};
use tokio::sync::broadcast;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use config::SnapshotConfig;
use output::SnapshotWriter;
use scheduler::Scheduler;

#[derive(Parser, Debug)]
#[command(name = "snapshotter")]
#[command(about = "Capture, stitch and archive regions of a tile map")]
struct Args {
    /// Configuration file
    #[arg(long, env = "SNAPSHOT_CONFIG", default_value = "config/snapshot.yaml", global = true)]
    config: PathBuf,

    /// Log level
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture the region once and exit
    Capture(CaptureArgs),
    /// Capture on the configured interval until interrupted
    Watch(CaptureArgs),
    /// Move saved images into per-day folders
    Organize {
        /// Directory to organize (defaults to output.dir)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Render one day's snapshots as an animated GIF
    Timelapse {
        /// Day to render, YYYYMMDD or YYYY-MM-DD (defaults to yesterday)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,

        /// Directory holding the snapshots (defaults to output.dir)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug, Clone)]
struct CaptureArgs {
    /// Override the region: tl_x,tl_y,tl_px,tl_py,br_x,br_y,br_px,br_py
    #[arg(long, value_parser = parse_region)]
    region: Option<BoundingBox>,

    /// Override the integer scale factor
    #[arg(long)]
    scale: Option<u32>,

    /// Override the output directory
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Override the cap on concurrent tile requests
    #[arg(long, env = "SNAPSHOT_MAX_CONCURRENT")]
    max_concurrent: Option<usize>,
}

fn parse_region(s: &str) -> Result<BoundingBox, String> {
    BoundingBox::from_csv(s).map_err(|e| e.to_string())
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y%m%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .map_err(|_| format!("expected YYYYMMDD or YYYY-MM-DD, got '{}'", s))
}

fn init_tracing(level: &str) -> Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Apply command-line overrides on top of the file configuration.
fn apply_overrides(config: &mut SnapshotConfig, args: &CaptureArgs) -> Result<()> {
    if let Some(region) = args.region {
        config.region = region;
    }
    if let Some(scale) = args.scale {
        config.output.scale_factor = ScaleFactor::new(scale).context("--scale")?;
    }
    if let Some(dir) = &args.output_dir {
        config.output.dir = dir.clone();
    }
    if let Some(max) = args.max_concurrent {
        config.fetch.max_concurrent = Some(max);
    }
    config.validate()
}

fn build_scheduler(config: &SnapshotConfig) -> Result<Scheduler> {
    let pipeline = SnapshotPipeline::with_http(config.fetch_config(), config.url_template()?)
        .context("Failed to create HTTP client")?;
    let writer = SnapshotWriter::new(
        config.output.dir.clone(),
        config.output.offset(),
        config.output.write_latest,
    );

    Ok(Scheduler::new(
        pipeline,
        writer,
        config.region,
        config.output.scale_factor,
        config.interval(),
    ))
}

async fn run(args: Args) -> Result<()> {
    match args.command {
        Command::Capture(overrides) => {
            let mut config = SnapshotConfig::load(&args.config)?;
            apply_overrides(&mut config, &overrides)?;

            info!(
                region = ?config.region,
                scale = config.output.scale_factor.get(),
                "Running single capture"
            );
            let path = build_scheduler(&config)?.run_once().await?;
            info!(path = %path.display(), "Capture finished");
        }
        Command::Watch(overrides) => {
            let mut config = SnapshotConfig::load(&args.config)?;
            apply_overrides(&mut config, &overrides)?;
            let scheduler = build_scheduler(&config)?;

            info!(
                interval_secs = config.schedule.interval_secs,
                "Starting periodic capture"
            );

            let (shutdown_tx, _) = broadcast::channel::<()>(1);
            let shutdown_tx_clone = shutdown_tx.clone();
            tokio::spawn(async move {
                tokio::signal::ctrl_c().await.ok();
                info!("Received shutdown signal");
                shutdown_tx_clone.send(()).ok();
            });

            scheduler.run_forever(shutdown_tx.subscribe()).await?;
        }
        Command::Organize { output_dir } => {
            let root = match output_dir {
                Some(dir) => dir,
                None => SnapshotConfig::load(&args.config)?.output.dir,
            };
            let report = archive::organize(&root)?;
            info!(
                moved = report.moved,
                already_sorted = report.already_sorted,
                dates = report.dates.len(),
                undated = report.undated.len(),
                "Archive organized"
            );
        }
        Command::Timelapse { date, output_dir } => {
            let config = SnapshotConfig::load(&args.config)?;
            let root = output_dir.unwrap_or_else(|| config.output.dir.clone());
            // Runs after midnight cover the day that just ended.
            let date = match date {
                Some(date) => date,
                None => Utc::now()
                    .with_timezone(&config.output.offset())
                    .date_naive()
                    .pred_opt()
                    .context("No previous day")?,
            };

            let settings = config.timelapse.clone();
            let report = tokio::task::spawn_blocking(move || {
                timelapse::create_timelapse(&root, date, &settings)
            })
            .await
            .context("Timelapse task failed")??;
            info!(
                path = %report.path.display(),
                frames = report.frames,
                skipped = report.skipped.len(),
                "Timelapse finished"
            );
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    if let Err(e) = init_tracing(&args.log_level) {
        eprintln!("Failed to initialize logging: {:#}", e);
        return ExitCode::FAILURE;
    }

    info!("Starting snapshotter");

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = format!("{:#}", e), "Snapshotter failed");
            ExitCode::FAILURE
        }
    }
}

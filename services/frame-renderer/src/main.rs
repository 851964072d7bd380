//! Frame renderer.
//!
//! Renders every frame of an animated map product:
//! - One image per region, depth and frame time of the timetable
//! - Frames newer than their inputs are skipped
//! - Optional copy of the video frame format into an upload directory

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use frame_common::time::parse_optional_date;
use frame_common::{AnimateConfig, FrameTimetableMap};
use frame_generator::{DirectoryUploader, FrameSequenceDriver, Services};
use renderer::Typeface;

#[derive(Parser, Debug)]
#[command(name = "frame-renderer")]
#[command(about = "Render animated map frames from gridded and vector inputs")]
struct Args {
    /// Product configuration (JSON or YAML)
    #[arg(short, long, env = "FRAME_RENDERER_CONFIG")]
    config: PathBuf,

    /// Frame timetable (JSON list of frame ranges and their inputs)
    #[arg(short, long, env = "FRAME_RENDERER_TIMETABLE")]
    timetable: PathBuf,

    /// Render a single region (default: all configured)
    #[arg(short, long, env = "FRAME_RENDERER_REGION")]
    region: Option<String>,

    /// First frame date; "null" for no bound
    #[arg(long)]
    date_from: Option<String>,

    /// Last frame date; "null" for no bound
    #[arg(long)]
    date_to: Option<String>,

    /// Copy video frames into this directory
    #[arg(long, env = "FRAME_RENDERER_UPLOAD_DIR")]
    upload_dir: Option<PathBuf>,

    /// Read inputs from local paths only
    #[arg(long)]
    offline: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log as JSON lines
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(args: &Args) -> Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    if args.log_json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args)?;

    let config = AnimateConfig::from_file(&args.config)
        .with_context(|| format!("Failed to load config {}", args.config.display()))?;
    let timetables = FrameTimetableMap::from_file(&args.timetable)
        .with_context(|| format!("Failed to load timetable {}", args.timetable.display()))?;
    let date_from = parse_optional_date(args.date_from.as_deref())?;
    let date_to = parse_optional_date(args.date_to.as_deref())?;

    let typeface = Typeface::load(
        config.render.font.regular.as_deref(),
        config.render.font.bold.as_deref(),
    )
    .context("Failed to load fonts")?;

    let mut services = if args.offline {
        Services::local()
    } else {
        Services::standard()?
    };
    if let Some(upload_dir) = &args.upload_dir {
        services = services.with_uploader(Box::new(DirectoryUploader::new(upload_dir)));
    }

    info!(
        product = %config.id,
        frames = timetables.len(),
        region = args.region.as_deref().unwrap_or("all"),
        "Starting frame renderer"
    );

    let mut driver = FrameSequenceDriver::new(config, timetables, services)
        .with_typeface(typeface)
        .with_region(args.region.clone())
        .with_date_range(date_from, date_to);

    let summary = driver.run()?;
    if summary.failed > 0 {
        error!(failed = summary.failed, "Some frames failed to render");
        anyhow::bail!("{} of {} frames failed", summary.failed, summary.total());
    }

    info!(
        rendered = summary.rendered,
        skipped = summary.skipped,
        "Done"
    );
    Ok(())
}

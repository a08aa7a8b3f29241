use std::error::Error;
use std::path::PathBuf;

use brickcast::{
    open_source, playback, AppConfig, FramePipeline, HeadlessDisplay, PlaybackSummary,
    DEFAULT_INPUT,
};
use clap::Parser;
use log::{info, warn, LevelFilter};

/// Estimate the pose of a checkerboard in every frame and draw a LEGO brick on it.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Video file, or a directory of frames read in name order.
    #[arg(default_value = DEFAULT_INPUT)]
    input: PathBuf,

    /// JSON config. Defaults are used for missing fields and when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write every displayed frame as PNG into this directory.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Run without a window.
    #[arg(long)]
    headless: bool,

    /// off, error, warn, info, debug or trace. `RUST_LOG` takes precedence.
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,

    /// Emit JSON logs (requires the `tracing` feature).
    #[arg(long)]
    json_log: bool,
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

#[cfg(feature = "tracing")]
fn init_logging(args: &Args) -> Result<(), Box<dyn Error>> {
    brickcast_core::init_tracing(args.log_level, args.json_log);
    Ok(())
}

#[cfg(not(feature = "tracing"))]
fn init_logging(args: &Args) -> Result<(), Box<dyn Error>> {
    let env = env_logger::Env::default()
        .default_filter_or(brickcast_core::filter_directives(args.log_level));
    env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init()?;
    if args.json_log {
        warn!("--json-log needs the `tracing` feature; using plain logs");
    }
    Ok(())
}

fn run_headless(
    pipeline: &FramePipeline,
    config: &AppConfig,
    args: &Args,
) -> Result<PlaybackSummary, Box<dyn Error>> {
    let source = open_source(&args.input)?;
    let mut display = match &args.output_dir {
        Some(dir) => HeadlessDisplay::with_output_dir(dir)?,
        None => HeadlessDisplay::new(),
    };
    Ok(playback::run(pipeline, &config.playback, source, &mut display)?)
}

#[cfg(feature = "opencv")]
fn run_windowed(
    pipeline: &FramePipeline,
    config: &AppConfig,
    args: &Args,
) -> Result<PlaybackSummary, Box<dyn Error>> {
    if args.output_dir.is_some() {
        warn!("--output-dir is only used with --headless");
    }
    let source = open_source(&args.input)?;
    let mut display = brickcast::opencv_io::HighGuiDisplay::new();
    Ok(playback::run(pipeline, &config.playback, source, &mut display)?)
}

#[cfg(not(feature = "opencv"))]
fn run_windowed(
    pipeline: &FramePipeline,
    config: &AppConfig,
    args: &Args,
) -> Result<PlaybackSummary, Box<dyn Error>> {
    warn!("built without the `opencv` feature; running headless");
    run_headless(pipeline, config, args)
}

fn try_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(&args)?;

    let config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    let pipeline = FramePipeline::new(&config)?;

    let summary = if args.headless {
        run_headless(&pipeline, &config, &args)?
    } else {
        run_windowed(&pipeline, &config, &args)?
    };

    info!("{summary:?}");
    println!(
        "frames: {}, posed: {}, no board: {}, count mismatch: {}, pose failed: {}",
        summary.frames,
        summary.detected,
        summary.not_detected,
        summary.count_mismatch,
        summary.pose_failed
    );
    Ok(())
}

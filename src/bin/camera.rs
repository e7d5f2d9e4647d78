use std::path::PathBuf;

use clap::Parser;
use color_tracker::{
    default_color_ranges, load_color_ranges, CameraSource, CentroidTracker, ColorSegmenter,
    HighguiDisplay, ModePipeline, SegmenterConfig,
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Live camera feed. Keys: n normal, g grayscale, b blur, c color tracking,
/// h histogram, q quit.
#[derive(Parser, Debug)]
#[command()]
struct Args {
    /// Camera device index.
    #[clap(long, default_value_t = 0)]
    camera_index: i32,

    /// Requested capture width.
    #[clap(long, default_value_t = 1600)]
    width: i32,

    /// Requested capture height.
    #[clap(long, default_value_t = 900)]
    height: i32,

    /// Milliseconds to wait for a key press each frame.
    #[clap(long, default_value_t = 1)]
    key_delay: i32,

    /// JSON file with color ranges, overrides the built-in blue/red/green set.
    #[clap(long)]
    colors: Option<PathBuf>,

    /// Minimum contour area for a color detection.
    #[clap(long, default_value_t = 500.0)]
    min_area: f64,

    /// Maximum centroid movement between frames that keeps an id.
    #[clap(long, default_value_t = 50.0)]
    max_distance: f64,

    /// Initial window size relative to the frame.
    #[clap(long, default_value_t = 1.0)]
    window_scale: f64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Args = Args::parse();

    let ranges = match &args.colors {
        Some(path) => load_color_ranges(path)?,
        None => default_color_ranges(),
    };
    info!(
        ranges = ?ranges.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
        "Loaded color ranges"
    );

    let segmenter = ColorSegmenter::new(SegmenterConfig {
        min_area: args.min_area,
        ..Default::default()
    })?;
    let tracker = CentroidTracker::new(args.max_distance);
    let mut pipeline =
        ModePipeline::new(ranges, segmenter, tracker).with_key_delay(args.key_delay);

    let mut camera_source = CameraSource::open(args.camera_index, args.width, args.height)?;
    let mut display = HighguiDisplay::new(args.window_scale);

    pipeline.run(&mut camera_source, &mut display)?;
    Ok(())
}

use std::path::PathBuf;

use clap::Parser;
use color_tracker::overlay::draw_tracks;
use color_tracker::{
    default_color_ranges, load_color_ranges, CentroidTracker, ColorSegmenter, SegmenterConfig,
    TrackerState,
};
use opencv::highgui;
use opencv::prelude::*;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Run color detection and tracking over still images, in the given order.
#[derive(Parser, Debug)]
#[command()]
struct Args {
    /// Images treated as consecutive frames.
    #[clap(required = true)]
    images: Vec<PathBuf>,

    /// JSON file with color ranges.
    #[clap(long)]
    colors: Option<PathBuf>,

    /// Show each annotated image and wait for a key.
    #[clap(long)]
    show: bool,
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
    let segmenter = ColorSegmenter::new(SegmenterConfig::default())?;
    let tracker = CentroidTracker::default();
    let mut state = TrackerState::new();

    let window = "detections";
    if args.show {
        highgui::named_window_def(window)?;
    }

    for path in &args.images {
        let mut frame = opencv::imgcodecs::imread_def(&path.to_string_lossy())?;
        if frame.size()?.width == 0 {
            anyhow::bail!("Unable to read image {}", path.display());
        }

        let detections = segmenter.detect(&frame, &ranges)?;
        state = tracker.update(state, &detections);

        println!("{}: {} objects", path.display(), state.len());
        for (detection, object) in detections.iter().zip(state.objects()) {
            let bbox = detection.bbox;
            println!(
                "  ID {} {} at ({}, {}) box {}x{}+{}+{}",
                object.id,
                object.label,
                object.center.x,
                object.center.y,
                bbox.width,
                bbox.height,
                bbox.x,
                bbox.y
            );
        }

        if args.show {
            draw_tracks(&mut frame, &detections, state.objects())?;
            highgui::imshow(window, &frame)?;
            highgui::wait_key(0)?;
        }
    }

    Ok(())
}

pub mod camera;
pub mod colors;
pub mod filters;
pub mod mode;
pub mod overlay;
pub mod pipeline;
pub mod segmenter;
pub mod tracker;

use thiserror::Error;

pub use camera::{CameraSource, DisplaySink, FrameSource, HighguiDisplay};
pub use colors::{default_color_ranges, load_color_ranges, ColorRange, Hsv};
pub use mode::{KeyAction, Mode};
pub use pipeline::{FrameOutput, ModePipeline, HISTOGRAM_WINDOW, MAIN_WINDOW};
pub use segmenter::{ColorSegmenter, Detection, SegmenterConfig};
pub use tracker::{centroid, CentroidTracker, TrackedObject, TrackerState, VelocityTracker};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unable to open camera {index}")]
    CameraOpen { index: i32 },
    #[error("Invalid color range {name:?}: {reason}")]
    InvalidColorRange { name: String, reason: String },
    #[error("OpenCV error {0:?}")]
    OpenCv(#[from] opencv::Error),
    #[error("Failed to read color config {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed color config {0}")]
    ColorConfig(#[from] serde_json::Error),
}

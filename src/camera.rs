use std::collections::HashSet;

use opencv::core::Mat;
use opencv::prelude::*;
use opencv::{highgui, videoio};
use tracing::{info, warn};

use crate::{Error, Result};

/// Where frames come from.
pub trait FrameSource {
    /// `Ok(None)` signals the source has no further frames.
    fn read(&mut self) -> Result<Option<Mat>>;

    fn release(&mut self) -> Result<()>;
}

/// Where annotated frames go, and where key presses come from.
pub trait DisplaySink {
    fn show(&mut self, window: &str, frame: &Mat) -> Result<()>;

    /// Wait up to `delay_ms` for a key and return its low byte.
    fn poll_key(&mut self, delay_ms: i32) -> Result<Option<i32>>;

    fn close(&mut self, window: &str) -> Result<()>;
}

pub struct CameraSource {
    camera: videoio::VideoCapture,
    released: bool,
}

impl CameraSource {
    pub fn open(index: i32, width: i32, height: i32) -> Result<Self> {
        let mut camera = videoio::VideoCapture::new(index, videoio::CAP_ANY)?;
        if !videoio::VideoCapture::is_opened(&camera)? {
            return Err(Error::CameraOpen { index });
        }
        camera.set(videoio::CAP_PROP_FRAME_WIDTH, f64::from(width))?;
        camera.set(videoio::CAP_PROP_FRAME_HEIGHT, f64::from(height))?;

        let actual_width = camera.get(videoio::CAP_PROP_FRAME_WIDTH)?;
        let actual_height = camera.get(videoio::CAP_PROP_FRAME_HEIGHT)?;
        info!(index, actual_width, actual_height, "Opened camera");

        Ok(Self {
            camera,
            released: false,
        })
    }
}

impl FrameSource for CameraSource {
    fn read(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();
        let grabbed = self.camera.read(&mut frame)?;
        if !grabbed || frame.size()?.width == 0 {
            return Ok(None);
        }
        Ok(Some(frame))
    }

    fn release(&mut self) -> Result<()> {
        if !self.released {
            self.released = true;
            self.camera.release()?;
        }
        Ok(())
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        if let Err(error) = self.release() {
            warn!(%error, "Failed to release camera");
        }
    }
}

/// highgui windows; each is created resizable the first time it is shown.
pub struct HighguiDisplay {
    windows: HashSet<String>,
    scale: f64,
}

impl HighguiDisplay {
    pub fn new(scale: f64) -> Self {
        Self {
            windows: HashSet::new(),
            scale,
        }
    }
}

impl Default for HighguiDisplay {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl DisplaySink for HighguiDisplay {
    fn show(&mut self, window: &str, frame: &Mat) -> Result<()> {
        if !self.windows.contains(window) {
            highgui::named_window(window, highgui::WINDOW_NORMAL)?;
            let size = frame.size()?;
            highgui::resize_window(
                window,
                (f64::from(size.width) * self.scale) as i32,
                (f64::from(size.height) * self.scale) as i32,
            )?;
            self.windows.insert(window.to_owned());
        }
        highgui::imshow(window, frame)?;
        Ok(())
    }

    fn poll_key(&mut self, delay_ms: i32) -> Result<Option<i32>> {
        let key = highgui::wait_key(delay_ms)?;
        Ok((key >= 0).then_some(key & 0xFF))
    }

    fn close(&mut self, window: &str) -> Result<()> {
        if self.windows.remove(window) {
            highgui::destroy_window(window)?;
        }
        Ok(())
    }
}

impl Drop for HighguiDisplay {
    fn drop(&mut self) {
        if let Err(error) = highgui::destroy_all_windows() {
            warn!(%error, "Failed to close windows");
        }
    }
}

use opencv::core::{self, Mat, Point, Rect, Size, Vector};
use opencv::imgproc;
use opencv::prelude::*;

use crate::colors::ColorRange;
use crate::Result;

/// A single frame's observation of a colored region.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub label: String,
    pub bbox: Rect,
}

impl Detection {
    pub fn new(label: impl Into<String>, bbox: Rect) -> Self {
        Self {
            label: label.into(),
            bbox,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    /// Regions must enclose strictly more than this contour area.
    pub min_area: f64,
    pub morph_iterations: i32,
    pub kernel_size: i32,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            min_area: 500.0,
            morph_iterations: 2,
            kernel_size: 3,
        }
    }
}

pub struct ColorSegmenter {
    config: SegmenterConfig,
    kernel: Mat,
}

impl ColorSegmenter {
    pub fn new(config: SegmenterConfig) -> Result<Self> {
        let kernel = imgproc::get_structuring_element(
            imgproc::MORPH_RECT,
            Size::new(config.kernel_size, config.kernel_size),
            Point::new(-1, -1),
        )?;
        Ok(Self { config, kernel })
    }

    /// Detect at most one region per range, in range declaration order.
    pub fn detect(&self, frame: &Mat, ranges: &[ColorRange]) -> Result<Vec<Detection>> {
        if ranges.is_empty() {
            return Ok(Vec::new());
        }

        let mut hsv = Mat::default();
        imgproc::cvt_color_def(frame, &mut hsv, imgproc::COLOR_BGR2HSV)?;

        let mut detections = Vec::new();
        for range in ranges {
            let mask = self.denoised_mask(&hsv, range)?;
            if let Some(bbox) = self.largest_region(&mask)? {
                detections.push(Detection::new(range.name.clone(), bbox));
            }
        }
        Ok(detections)
    }

    /// Binary mask of in-range pixels after erosion and dilation.
    pub fn denoised_mask(&self, hsv: &Mat, range: &ColorRange) -> Result<Mat> {
        let mut mask: Option<Mat> = None;
        for (lower, upper) in range.bounds() {
            let mut partial = Mat::default();
            core::in_range(hsv, &lower, &upper, &mut partial)?;
            mask = Some(match mask {
                Some(previous) => {
                    let mut combined = Mat::default();
                    core::bitwise_or(&previous, &partial, &mut combined, &core::no_array())?;
                    combined
                }
                None => partial,
            });
        }
        let mask = mask.unwrap_or_default();

        let border_value = imgproc::morphology_default_border_value()?;
        let mut eroded = Mat::default();
        imgproc::erode(
            &mask,
            &mut eroded,
            &self.kernel,
            Point::new(-1, -1),
            self.config.morph_iterations,
            core::BORDER_CONSTANT,
            border_value,
        )?;
        let mut dilated = Mat::default();
        imgproc::dilate(
            &eroded,
            &mut dilated,
            &self.kernel,
            Point::new(-1, -1),
            self.config.morph_iterations,
            core::BORDER_CONSTANT,
            border_value,
        )?;
        Ok(dilated)
    }

    /// Bounding box of the largest external contour, if it clears `min_area`.
    ///
    /// Equal areas keep the first contour found.
    pub fn largest_region(&self, mask: &Mat) -> Result<Option<Rect>> {
        let mut contours: Vector<Vector<Point>> = Vector::new();
        imgproc::find_contours(
            mask,
            &mut contours,
            imgproc::RETR_EXTERNAL,
            imgproc::CHAIN_APPROX_SIMPLE,
            Point::new(0, 0),
        )?;

        let mut largest: Option<(f64, Vector<Point>)> = None;
        for contour in contours.iter() {
            let area = imgproc::contour_area(&contour, false)?;
            let is_larger = largest
                .as_ref()
                .map_or(true, |(max_area, _)| area > *max_area);
            if is_larger {
                largest = Some((area, contour));
            }
        }

        match largest {
            Some((area, contour)) if area > self.config.min_area => {
                Ok(Some(imgproc::bounding_rect(&contour)?))
            }
            _ => Ok(None),
        }
    }
}

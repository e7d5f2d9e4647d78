use opencv::core::{self, Mat, Point, Scalar, Size, Vector, CV_8UC3};
use opencv::imgproc;
use opencv::prelude::*;

use crate::Result;

pub const BLUR_KERNEL_SIZE: i32 = 15;

const HISTOGRAM_BINS: i32 = 256;

pub fn convert_to_grayscale(image: &Mat) -> Result<Mat> {
    let mut gray = Mat::default();
    imgproc::cvt_color_def(image, &mut gray, imgproc::COLOR_BGR2GRAY)?;
    Ok(gray)
}

/// Gaussian blur with a square kernel; sigma is derived from the kernel size.
pub fn apply_blur(image: &Mat, kernel_size: i32) -> Result<Mat> {
    let mut blurred = Mat::default();
    imgproc::gaussian_blur(
        image,
        &mut blurred,
        Size::new(kernel_size, kernel_size),
        0.0,
        0.0,
        core::BORDER_DEFAULT,
    )?;
    Ok(blurred)
}

fn channel_colors(channels: i32) -> Vec<Scalar> {
    if channels == 1 {
        vec![Scalar::all(255.0)]
    } else {
        vec![
            Scalar::new(255.0, 0.0, 0.0, 0.0),
            Scalar::new(0.0, 255.0, 0.0, 0.0),
            Scalar::new(0.0, 0.0, 255.0, 0.0),
        ]
    }
}

/// Render per-channel intensity histograms of `image` onto a black canvas.
pub fn histogram_canvas(image: &Mat, width: i32, height: i32) -> Result<Mat> {
    let mut canvas =
        Mat::new_rows_cols_with_default(height, width, CV_8UC3, Scalar::all(0.0))?;

    let mut planes: Vector<Mat> = Vector::new();
    core::split(image, &mut planes)?;

    let bin_width = f64::from(width) / f64::from(HISTOGRAM_BINS);
    let colors = channel_colors(image.channels());

    for (plane, color) in planes.iter().zip(colors) {
        let mut images: Vector<Mat> = Vector::new();
        images.push(plane);

        let mut hist = Mat::default();
        imgproc::calc_hist(
            &images,
            &Vector::from_slice(&[0]),
            &core::no_array(),
            &mut hist,
            &Vector::from_slice(&[HISTOGRAM_BINS]),
            &Vector::from_slice(&[0.0f32, 256.0]),
            false,
        )?;

        let mut normalized = Mat::default();
        core::normalize(
            &hist,
            &mut normalized,
            0.0,
            f64::from(height),
            core::NORM_MINMAX,
            -1,
            &core::no_array(),
        )?;

        let point_at = |bin: i32| -> Result<Point> {
            let value = *normalized.at::<f32>(bin)?;
            Ok(Point::new(
                (f64::from(bin) * bin_width) as i32,
                height - value.round() as i32,
            ))
        };

        let mut previous = point_at(0)?;
        for bin in 1..HISTOGRAM_BINS {
            let current = point_at(bin)?;
            imgproc::line(&mut canvas, previous, current, color, 2, imgproc::LINE_8, 0)?;
            previous = current;
        }
    }

    Ok(canvas)
}

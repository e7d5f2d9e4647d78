use opencv::core::{Mat, Point, Scalar};
use opencv::imgproc;

use crate::segmenter::Detection;
use crate::tracker::TrackedObject;
use crate::Result;

fn green() -> Scalar {
    Scalar::new(0.0, 255.0, 0.0, 0.0)
}

fn red() -> Scalar {
    Scalar::new(0.0, 0.0, 255.0, 0.0)
}

fn label(frame: &mut Mat, text: &str, origin: Point, color: Scalar) -> Result<()> {
    imgproc::put_text(
        frame,
        text,
        origin,
        imgproc::FONT_HERSHEY_SIMPLEX,
        0.6,
        color,
        2,
        imgproc::LINE_8,
        false,
    )?;
    Ok(())
}

/// Draw each detection's box and label alongside its tracked id and centroid.
///
/// `objects` is expected in detection order, as returned by the tracker.
pub fn draw_tracks(
    frame: &mut Mat,
    detections: &[Detection],
    objects: &[TrackedObject],
) -> Result<()> {
    for (detection, object) in detections.iter().zip(objects) {
        let bbox = detection.bbox;
        imgproc::rectangle(frame, bbox, green(), 2, imgproc::LINE_8, 0)?;
        label(frame, &detection.label, Point::new(bbox.x, bbox.y - 10), green())?;

        imgproc::circle(frame, object.center, 4, red(), imgproc::FILLED, imgproc::LINE_8, 0)?;
        label(
            frame,
            &format!("ID {}", object.id),
            Point::new(object.center.x + 8, object.center.y),
            red(),
        )?;
    }
    Ok(())
}

pub fn draw_velocity(frame: &mut Mat, center: Point, velocity: Point) -> Result<()> {
    if velocity == Point::new(0, 0) {
        return Ok(());
    }
    let tip = Point::new(center.x + velocity.x, center.y + velocity.y);
    imgproc::arrowed_line(frame, center, tip, red(), 2, imgproc::LINE_8, 0, 0.3)?;
    Ok(())
}

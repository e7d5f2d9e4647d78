//! Per-frame mode dispatch and the capture/display loop around it.

use opencv::core::{Mat, Point};
use tracing::{debug, info, warn};

use crate::camera::{DisplaySink, FrameSource};
use crate::colors::ColorRange;
use crate::filters::{self, BLUR_KERNEL_SIZE};
use crate::mode::{KeyAction, Mode};
use crate::overlay;
use crate::segmenter::ColorSegmenter;
use crate::tracker::{CentroidTracker, TrackerState, VelocityTracker};
use crate::Result;

pub const MAIN_WINDOW: &str = "Camera Feed";
pub const HISTOGRAM_WINDOW: &str = "Color Histogram";

/// What a single frame produced for display.
pub struct FrameOutput {
    pub display: Mat,
    /// Only present in histogram mode.
    pub histogram: Option<Mat>,
}

#[derive(Default)]
struct TrackingSession {
    state: TrackerState,
    velocity: VelocityTracker,
    velocity_id: Option<u64>,
}

impl TrackingSession {
    fn starting_from(state: TrackerState) -> Self {
        Self {
            state,
            ..Default::default()
        }
    }

    /// Center and velocity while exactly one object is tracked.
    ///
    /// A new id on that single object restarts the velocity from zero.
    fn observe_single(&mut self) -> Option<(Point, Point)> {
        let single = match self.state.objects() {
            [only] => Some((only.id, only.center)),
            _ => None,
        };
        let id = single.map(|(id, _)| id);
        if id.is_some() && id != self.velocity_id {
            self.velocity.reset();
        }
        self.velocity_id = id;

        let center = single.map(|(_, center)| center);
        let velocity = self.velocity.observe(center)?;
        center.map(|center| (center, velocity))
    }
}

pub struct ModePipeline {
    mode: Mode,
    ranges: Vec<ColorRange>,
    segmenter: ColorSegmenter,
    tracker: CentroidTracker,
    // lives exactly as long as color detection stays selected
    session: Option<TrackingSession>,
    // carries id allocation from one color detection session to the next
    retired: TrackerState,
    key_delay_ms: i32,
    histogram_size: (i32, i32),
}

impl ModePipeline {
    pub fn new(
        ranges: Vec<ColorRange>,
        segmenter: ColorSegmenter,
        tracker: CentroidTracker,
    ) -> Self {
        Self {
            mode: Mode::default(),
            ranges,
            segmenter,
            tracker,
            session: None,
            retired: TrackerState::new(),
            key_delay_ms: 1,
            histogram_size: (1200, 800),
        }
    }

    pub fn with_key_delay(mut self, key_delay_ms: i32) -> Self {
        self.key_delay_ms = key_delay_ms;
        self
    }

    pub fn with_histogram_size(mut self, width: i32, height: i32) -> Self {
        self.histogram_size = (width, height);
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Tracker state while color detection is active.
    pub fn tracking_state(&self) -> Option<&TrackerState> {
        self.session.as_ref().map(|session| &session.state)
    }

    /// Entering color detection starts with no tracked objects; leaving it
    /// discards them. Ids keep counting up across sessions.
    pub fn set_mode(&mut self, mode: Mode) {
        if mode == self.mode {
            return;
        }
        if let Some(session) = self.session.take() {
            self.retired = session.state.restart();
        }
        if mode == Mode::ColorDetect {
            self.session = Some(TrackingSession::starting_from(self.retired.restart()));
        }
        self.mode = mode;
        info!("Switched to {mode} mode");
    }

    pub fn handle_key(&mut self, code: Option<i32>) -> KeyAction {
        let action = KeyAction::from_key_code(code);
        if let KeyAction::Switch(mode) = action {
            self.set_mode(mode);
        }
        action
    }

    pub fn process_frame(&mut self, frame: &Mat) -> Result<FrameOutput> {
        let mut histogram = None;
        let display = match self.mode {
            Mode::Normal => frame.clone(),
            Mode::Grayscale => filters::convert_to_grayscale(frame)?,
            Mode::Blur => filters::apply_blur(frame, BLUR_KERNEL_SIZE)?,
            Mode::ColorDetect => self.detect_and_track(frame)?,
            Mode::Histogram => {
                let (width, height) = self.histogram_size;
                histogram = Some(filters::histogram_canvas(frame, width, height)?);
                frame.clone()
            }
        };
        Ok(FrameOutput { display, histogram })
    }

    fn detect_and_track(&mut self, frame: &Mat) -> Result<Mat> {
        let detections = self.segmenter.detect(frame, &self.ranges)?;

        let retired = &self.retired;
        let session = self
            .session
            .get_or_insert_with(|| TrackingSession::starting_from(retired.restart()));
        let previous = std::mem::take(&mut session.state);
        session.state = self.tracker.update(previous, &detections);
        debug!(
            detections = detections.len(),
            tracks = session.state.len(),
            next_id = session.state.next_id(),
            "Tracked frame"
        );

        let mut annotated = frame.clone();
        overlay::draw_tracks(&mut annotated, &detections, session.state.objects())?;

        if let Some((center, velocity)) = session.observe_single() {
            overlay::draw_velocity(&mut annotated, center, velocity)?;
        }

        Ok(annotated)
    }

    /// Run until quit, an exhausted source or an error.
    ///
    /// The source is released on every exit path.
    pub fn run<S, D>(&mut self, source: &mut S, display: &mut D) -> Result<()>
    where
        S: FrameSource,
        D: DisplaySink,
    {
        let outcome = self.run_loop(source, display);
        let released = source.release();
        outcome?;
        released
    }

    fn run_loop<S, D>(&mut self, source: &mut S, display: &mut D) -> Result<()>
    where
        S: FrameSource,
        D: DisplaySink,
    {
        let mut histogram_open = false;
        loop {
            let Some(frame) = source.read()? else {
                warn!("Failed to grab frame");
                return Ok(());
            };

            let output = self.process_frame(&frame)?;
            display.show(MAIN_WINDOW, &output.display)?;

            match output.histogram {
                Some(canvas) => {
                    display.show(HISTOGRAM_WINDOW, &canvas)?;
                    histogram_open = true;
                }
                None if histogram_open => {
                    display.close(HISTOGRAM_WINDOW)?;
                    histogram_open = false;
                }
                None => {}
            }

            let key = display.poll_key(self.key_delay_ms)?;
            if self.handle_key(key) == KeyAction::Quit {
                info!("Quit requested");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colors::default_color_ranges;
    use crate::segmenter::{Detection, SegmenterConfig};
    use opencv::core::{self, Rect, Scalar, Vector, CV_8UC3};
    use opencv::imgproc;
    use opencv::prelude::*;

    fn pipeline() -> ModePipeline {
        ModePipeline::new(
            default_color_ranges(),
            ColorSegmenter::new(SegmenterConfig::default()).unwrap(),
            CentroidTracker::default(),
        )
        .with_histogram_size(256, 100)
    }

    fn frame_with_blue_box(x: i32) -> Mat {
        let mut frame =
            Mat::new_rows_cols_with_default(200, 300, CV_8UC3, Scalar::all(0.0)).unwrap();
        imgproc::rectangle(
            &mut frame,
            Rect::new(x, 50, 40, 40),
            Scalar::new(255.0, 0.0, 0.0, 0.0),
            imgproc::FILLED,
            imgproc::LINE_8,
            0,
        )
        .unwrap();
        frame
    }

    fn key(c: char) -> Option<i32> {
        Some(c as i32)
    }

    #[test]
    fn starts_in_normal_mode_with_identity_output() {
        let mut pipeline = pipeline();
        let frame = frame_with_blue_box(10);
        let output = pipeline.process_frame(&frame).unwrap();

        assert_eq!(pipeline.mode(), Mode::Normal);
        assert_eq!(output.display.data_bytes().unwrap(), frame.data_bytes().unwrap());
        assert!(output.histogram.is_none());
        assert!(pipeline.tracking_state().is_none());
    }

    #[test]
    fn unrecognised_key_keeps_mode() {
        let mut pipeline = pipeline();
        pipeline.handle_key(key('g'));
        assert_eq!(pipeline.handle_key(key('z')), KeyAction::Ignore);
        assert_eq!(pipeline.handle_key(None), KeyAction::Ignore);
        assert_eq!(pipeline.mode(), Mode::Grayscale);
    }

    #[test]
    fn histogram_mode_keeps_identity_display() {
        let mut pipeline = pipeline();
        pipeline.handle_key(key('h'));
        let frame = frame_with_blue_box(10);
        let output = pipeline.process_frame(&frame).unwrap();

        assert_eq!(output.display.data_bytes().unwrap(), frame.data_bytes().unwrap());
        assert!(output.histogram.is_some());
    }

    #[test]
    fn color_mode_tracks_across_frames() {
        let mut pipeline = pipeline();
        pipeline.handle_key(key('c'));

        for x in [10, 20, 30, 40] {
            pipeline.process_frame(&frame_with_blue_box(x)).unwrap();
            assert_eq!(pipeline.tracking_state().unwrap().ids(), vec![0]);
        }
    }

    #[test]
    fn reentering_color_mode_forgets_objects_but_not_ids() {
        let mut pipeline = pipeline();
        pipeline.handle_key(key('c'));
        pipeline.process_frame(&frame_with_blue_box(10)).unwrap();
        pipeline.process_frame(&frame_with_blue_box(100)).unwrap();
        assert_eq!(pipeline.tracking_state().unwrap().ids(), vec![1]);

        pipeline.handle_key(key('n'));
        assert!(pipeline.tracking_state().is_none());

        pipeline.handle_key(key('c'));
        assert!(pipeline.tracking_state().unwrap().is_empty());
        // same spot as id 1, yet a fresh id above every one issued so far
        pipeline.process_frame(&frame_with_blue_box(100)).unwrap();
        assert_eq!(pipeline.tracking_state().unwrap().ids(), vec![2]);

        pipeline.handle_key(key('g'));
        pipeline.handle_key(key('c'));
        pipeline.process_frame(&frame_with_blue_box(100)).unwrap();
        assert_eq!(pipeline.tracking_state().unwrap().ids(), vec![3]);
    }

    #[test]
    fn single_moving_object_gets_velocity_arrow() {
        let mut moving = pipeline();
        moving.handle_key(key('c'));
        moving.process_frame(&frame_with_blue_box(10)).unwrap();
        let with_arrow = moving.process_frame(&frame_with_blue_box(40)).unwrap().display;

        // first sighting has zero velocity, so the same overlay minus the arrow
        let mut still = pipeline();
        still.handle_key(key('c'));
        let without_arrow = still.process_frame(&frame_with_blue_box(40)).unwrap().display;
        assert_eq!(moving.tracking_state(), still.tracking_state());

        let mut diff = Mat::default();
        core::absdiff(&with_arrow, &without_arrow, &mut diff).unwrap();
        let diff = filters::convert_to_grayscale(&diff).unwrap();
        let mut changed: Vector<Point> = Vector::new();
        core::find_non_zero(&diff, &mut changed).unwrap();
        assert!(!changed.is_empty());

        // arrow runs from the centroid (60, 70) to the tip (90, 70)
        let area = imgproc::bounding_rect(&changed).unwrap();
        assert!(area.x >= 55 && area.x + area.width <= 95, "{area:?}");
        assert!(area.y >= 60 && area.y + area.height <= 81, "{area:?}");
    }

    #[test]
    fn velocity_restarts_when_single_object_changes_id() {
        let tracker = CentroidTracker::default();
        let mut session = TrackingSession::default();
        let box_at = |x| Detection::new("Blue", Rect::new(x, 0, 20, 20));

        session.state = tracker.update(std::mem::take(&mut session.state), &[box_at(0)]);
        assert_eq!(session.observe_single(), Some((Point::new(10, 10), Point::new(0, 0))));

        session.state = tracker.update(std::mem::take(&mut session.state), &[box_at(20)]);
        assert_eq!(session.observe_single(), Some((Point::new(30, 10), Point::new(20, 0))));

        // too far to keep its id, so no velocity is measured from the old object
        session.state = tracker.update(std::mem::take(&mut session.state), &[box_at(200)]);
        assert_eq!(session.state.ids(), vec![1]);
        assert_eq!(session.observe_single(), Some((Point::new(210, 10), Point::new(0, 0))));
    }

    #[test]
    fn no_velocity_with_several_objects() {
        let tracker = CentroidTracker::default();
        let mut session = TrackingSession::default();
        let detections = [
            Detection::new("Blue", Rect::new(0, 0, 20, 20)),
            Detection::new("Red", Rect::new(200, 0, 20, 20)),
        ];
        session.state = tracker.update(TrackerState::new(), &detections);
        assert_eq!(session.observe_single(), None);
    }

    #[test]
    fn reselecting_color_mode_keeps_tracking() {
        let mut pipeline = pipeline();
        pipeline.handle_key(key('c'));
        pipeline.process_frame(&frame_with_blue_box(10)).unwrap();
        pipeline.handle_key(key('c'));
        pipeline.process_frame(&frame_with_blue_box(15)).unwrap();
        assert_eq!(pipeline.tracking_state().unwrap().ids(), vec![0]);
    }
}

//! Centroid based identity tracking.
//!
//! Each frame the tracker greedily matches detections, in the order they were
//! produced, to the nearest surviving object from the previous frame. This is
//! not a globally optimal assignment: an earlier detection can claim an object
//! a later one was closer to. Objects that go unmatched for a single frame are
//! dropped and ids are never handed out twice.

use opencv::core::{Point, Rect};

use crate::segmenter::Detection;

/// Center of a bounding box, truncating toward the top-left.
pub fn centroid(bbox: Rect) -> Point {
    Point::new(bbox.x + bbox.width / 2, bbox.y + bbox.height / 2)
}

fn distance(a: Point, b: Point) -> f64 {
    f64::from(a.x - b.x).hypot(f64::from(a.y - b.y))
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackedObject {
    pub id: u64,
    pub center: Point,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerState {
    /// Objects in the order they were matched last frame.
    objects: Vec<TrackedObject>,
    next_id: u64,
}

impl TrackerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn objects(&self) -> &[TrackedObject] {
        &self.objects
    }

    pub fn get(&self, id: u64) -> Option<&TrackedObject> {
        self.objects.iter().find(|object| object.id == id)
    }

    pub fn ids(&self) -> Vec<u64> {
        self.objects.iter().map(|object| object.id).collect()
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// An empty table that keeps allocating ids after this one's.
    pub fn restart(&self) -> TrackerState {
        TrackerState {
            objects: Vec::new(),
            next_id: self.next_id,
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct CentroidTracker {
    /// Matches must be strictly closer than this.
    pub max_distance: f64,
}

impl Default for CentroidTracker {
    fn default() -> Self {
        Self { max_distance: 50.0 }
    }
}

impl CentroidTracker {
    pub fn new(max_distance: f64) -> Self {
        Self { max_distance }
    }

    pub fn update(&self, state: TrackerState, detections: &[Detection]) -> TrackerState {
        let TrackerState {
            objects: mut candidates,
            mut next_id,
        } = state;
        let mut objects = Vec::with_capacity(detections.len());

        for detection in detections {
            let center = centroid(detection.bbox);

            let mut closest: Option<(usize, f64)> = None;
            for (index, candidate) in candidates.iter().enumerate() {
                let d = distance(center, candidate.center);
                let best = closest.map_or(self.max_distance, |(_, best)| best);
                if d < best {
                    closest = Some((index, d));
                }
            }

            let id = match closest {
                Some((index, _)) => candidates.remove(index).id,
                None => {
                    let id = next_id;
                    next_id += 1;
                    id
                }
            };

            objects.push(TrackedObject {
                id,
                center,
                label: detection.label.clone(),
            });
        }

        TrackerState { objects, next_id }
    }
}

/// Frame to frame displacement of a single tracked entity.
#[derive(Debug, Clone, Default)]
pub struct VelocityTracker {
    previous: Option<Point>,
}

impl VelocityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the velocity for this frame, or `None` while the object is lost.
    pub fn observe(&mut self, center: Option<Point>) -> Option<Point> {
        let velocity = center.map(|current| match self.previous {
            Some(previous) => Point::new(current.x - previous.x, current.y - previous.y),
            None => Point::new(0, 0),
        });
        self.previous = center;
        velocity
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }
}

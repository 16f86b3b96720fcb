use serde::{Deserialize, Serialize};

/// Axis-aligned box in image pixel space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    /// Midpoint of the box.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.x1 as f64 + self.x2 as f64) / 2.0,
            (self.y1 as f64 + self.y2 as f64) / 2.0,
        )
    }
}

/// One object reported by a detector backend.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DetectedObject {
    pub bounds: BoundingBox,
    /// COCO category id.
    pub class_id: u32,
    /// Detector confidence in [0, 1].
    pub confidence: f32,
}

impl DetectedObject {
    /// Derived center point; recomputed per detection, never persisted.
    pub fn center(&self) -> (f64, f64) {
        self.bounds.center()
    }
}

/// COCO class ids that count as vehicles: car, motorcycle, bus, truck.
pub const VEHICLE_CLASS_IDS: [u32; 4] = [2, 3, 5, 7];

/// Detector-adapter duty: only allow-listed classes at or above the
/// confidence threshold may reach the occupancy classifier.
pub fn filter_vehicles(
    objects: Vec<DetectedObject>,
    allow_list: &[u32],
    min_confidence: f32,
) -> Vec<DetectedObject> {
    objects
        .into_iter()
        .filter(|object| {
            allow_list.contains(&object.class_id) && object.confidence >= min_confidence
        })
        .collect()
}

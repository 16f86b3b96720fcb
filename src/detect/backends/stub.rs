use anyhow::Result;

use crate::detect::backend::VehicleDetector;
use crate::detect::result::DetectedObject;

/// Stub detector for tests and demos: reports a fixed set of objects on
/// every frame.
#[derive(Debug, Default)]
pub struct StubDetector {
    objects: Vec<DetectedObject>,
    frames_seen: u64,
}

impl StubDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_objects(objects: Vec<DetectedObject>) -> Self {
        Self {
            objects,
            frames_seen: 0,
        }
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }
}

impl VehicleDetector for StubDetector {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, _pixels: &[u8], _width: u32, _height: u32) -> Result<Vec<DetectedObject>> {
        self.frames_seen += 1;
        Ok(self.objects.clone())
    }
}

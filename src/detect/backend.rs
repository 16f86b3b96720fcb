use anyhow::Result;

use crate::detect::result::DetectedObject;

/// Object detector seam.
///
/// The detector is an opaque capability: given an RGB8 pixel buffer it
/// returns bounding boxes with a class id and a confidence score.
/// Implementations must not interpret occupancy; vehicle filtering and slot
/// membership live outside this boundary.
pub trait VehicleDetector: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on one RGB8 frame.
    ///
    /// The pixel slice is read-only and ephemeral; implementations must not
    /// retain it beyond the call.
    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<DetectedObject>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

//! Object detection seam: the trait boundary, its backends, and the adapter
//! that filters raw detections down to classifier-ready vehicles.

pub mod backend;
pub mod backends;
pub mod result;

pub use backend::VehicleDetector;
pub use backends::StubDetector;
#[cfg(feature = "backend-tract")]
pub use backends::TractDetector;
pub use result::{filter_vehicles, BoundingBox, DetectedObject, VEHICLE_CLASS_IDS};

use anyhow::{anyhow, Result};

use crate::config::DetectorSettings;

/// Build the configured detector backend.
pub fn build_detector(settings: &DetectorSettings) -> Result<Box<dyn VehicleDetector>> {
    match settings.backend.as_str() {
        "stub" => Ok(Box::new(StubDetector::new())),
        #[cfg(feature = "backend-tract")]
        "tract" => {
            let model_path = settings
                .model_path
                .as_ref()
                .ok_or_else(|| anyhow!("detector 'tract' requires a model path"))?;
            let mut detector = TractDetector::new(
                model_path,
                settings.input_width,
                settings.input_height,
            )?;
            detector.warm_up()?;
            Ok(Box::new(detector))
        }
        #[cfg(not(feature = "backend-tract"))]
        "tract" => Err(anyhow!(
            "detector 'tract' requires building with the backend-tract feature"
        )),
        other => Err(anyhow!("unknown detector backend '{}'", other)),
    }
}

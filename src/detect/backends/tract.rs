use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::VehicleDetector;
use crate::detect::result::{BoundingBox, DetectedObject};

/// Tract-based detector for ONNX object-detection models.
///
/// Loads a local model file and performs inference on RGB frames; no network
/// I/O beyond model loading. The model is expected to emit one tensor of
/// shape `(N, 6)` with rows `[x1, y1, x2, y2, confidence, class]` in input
/// pixel coordinates.
pub struct TractDetector {
    model: TypedRunnableModel<TypedModel>,
    width: u32,
    height: u32,
}

impl TractDetector {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, width: u32, height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, height as usize, width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            width,
            height,
        })
    }

    fn build_input(&self, pixels: &[u8], width: u32, height: u32) -> Result<Tensor> {
        if width != self.width || height != self.height {
            return Err(anyhow!(
                "frame size {}x{} does not match model input {}x{}",
                width,
                height,
                self.width,
                self.height
            ));
        }

        let expected_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|len| len.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if pixels.len() != expected_len {
            return Err(anyhow!(
                "expected {} RGB bytes, received {}",
                expected_len,
                pixels.len()
            ));
        }

        let width = width as usize;
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, height as usize, width),
            |(_, channel, y, x)| {
                let idx = (y * width + x) * 3 + channel;
                pixels[idx] as f32 / 255.0
            },
        );

        Ok(input.into_tensor())
    }

    fn parse_detections(&self, outputs: TVec<TValue>) -> Result<Vec<DetectedObject>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;

        // Accept (N, 6) and the batched (1, N, 6) layout.
        let rows = match view.ndim() {
            2 => view.into_dimensionality::<tract_ndarray::Ix2>()?,
            3 => view
                .index_axis_move(tract_ndarray::Axis(0), 0)
                .into_dimensionality::<tract_ndarray::Ix2>()?,
            other => return Err(anyhow!("unexpected output rank {}", other)),
        };
        if rows.shape()[1] < 6 {
            return Err(anyhow!(
                "expected rows of at least 6 values, got {}",
                rows.shape()[1]
            ));
        }

        let mut objects = Vec::with_capacity(rows.shape()[0]);
        for row in rows.outer_iter() {
            let confidence = row[4];
            if !(0.0..=1.0).contains(&confidence) {
                continue;
            }
            objects.push(DetectedObject {
                bounds: BoundingBox {
                    x1: row[0],
                    y1: row[1],
                    x2: row[2],
                    y2: row[3],
                },
                class_id: row[5].max(0.0) as u32,
                confidence,
            });
        }
        Ok(objects)
    }
}

impl VehicleDetector for TractDetector {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<DetectedObject>> {
        let input = self.build_input(pixels, width, height)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.parse_detections(outputs)
    }
}

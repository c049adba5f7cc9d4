#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::imageops::FilterType;
use tract_onnx::prelude::*;

use crate::cable::CableType;
use crate::detect::backend::{ClassifierBackend, Inference};
use crate::detect::error::DetectError;
use crate::detect::result::AlternativeDetection;
use crate::input::ImageInput;

/// Tract-based backend for an ONNX cable classifier.
///
/// The model takes a `1x3xHxW` f32 RGB tensor scaled to [0, 1] and returns one
/// score per entry of [`CableType::ALL`]. Scores are softmaxed; the arg-max is
/// the primary classification and the rest become candidates. No bounding box
/// is reported.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    width: u32,
    height: u32,
}

impl TractBackend {
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

        log::info!(
            "loaded ONNX cable classifier from {} ({}x{})",
            model_path.display(),
            width,
            height
        );
        Ok(Self {
            model,
            width,
            height,
        })
    }

    fn build_input(&self, image: &ImageInput) -> Result<Tensor, DetectError> {
        let rgb = image.decode_rgb()?;
        let resized =
            image::imageops::resize(&rgb, self.width, self.height, FilterType::Triangle);

        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, self.height as usize, self.width as usize),
            |(_, channel, y, x)| resized.get_pixel(x as u32, y as u32)[channel] as f32 / 255.0,
        );
        Ok(input.into_tensor())
    }

    fn extract_scores(&self, outputs: TVec<TValue>) -> Result<Vec<f32>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let scores = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let scores: Vec<f32> = scores.iter().copied().collect();
        if scores.len() != CableType::ALL.len() {
            return Err(anyhow!(
                "expected {} class scores, received {}",
                CableType::ALL.len(),
                scores.len()
            ));
        }
        Ok(scores)
    }
}

fn softmax(scores: &[f32]) -> Option<Vec<f32>> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return None;
    }
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    (sum.is_finite() && sum > 0.0).then(|| exps.iter().map(|e| e / sum).collect())
}

impl ClassifierBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn infer(&self, image: &ImageInput) -> Result<Inference, DetectError> {
        let input = self.build_input(image)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")
            .map_err(DetectError::ProcessingFailed)?;
        let scores = self
            .extract_scores(outputs)
            .map_err(DetectError::ProcessingFailed)?;
        let probabilities = softmax(&scores).ok_or(DetectError::NoDetectionFound)?;

        let (best, confidence) = probabilities
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .ok_or(DetectError::NoDetectionFound)?;

        let candidates = CableType::ALL
            .into_iter()
            .zip(probabilities.iter().copied())
            .filter(|(t, _)| t.index() != best)
            .map(|(t, p)| AlternativeDetection::new(t, p, None))
            .collect();

        Ok(Inference {
            cable_type: CableType::ALL[best],
            confidence,
            bounding_box: None,
            candidates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn softmax_normalises_and_rejects_non_finite() {
        let p = softmax(&[1.0, 2.0, 3.0]).unwrap();
        assert!((p.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!(p[2] > p[1] && p[1] > p[0]);
        assert!(softmax(&[f32::NAN, f32::NEG_INFINITY]).is_none());
    }
}

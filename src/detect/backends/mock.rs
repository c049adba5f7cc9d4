use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::anyhow;
use sha2::{Digest, Sha256};

use crate::cable::CableType;
use crate::detect::backend::{ClassifierBackend, Inference};
use crate::detect::error::DetectError;
use crate::detect::geometry::BoundingBox;
use crate::input::ImageInput;

/// Canned scenarios for UI and pipeline tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MockScenario {
    /// High-confidence USB-C with one weak alternative.
    UsbCClear,
    /// Medium-confidence Lightning, partially occluded.
    LightningPartial,
    /// Low-confidence USB-A with two close alternatives.
    UnclearCable,
}

impl MockScenario {
    pub fn inference(self) -> Inference {
        let bbox = |x, y, w, h| BoundingBox::clamped(x, y, w, h);
        match self {
            MockScenario::UsbCClear => Inference::new(CableType::UsbC, 0.95)
                .with_bounding_box(bbox(0.2, 0.3, 0.6, 0.4))
                .with_candidate(CableType::Usb30, 0.15),
            MockScenario::LightningPartial => Inference::new(CableType::Lightning, 0.72)
                .with_bounding_box(bbox(0.1, 0.2, 0.8, 0.6))
                .with_candidate(CableType::MicroUsb, 0.28),
            MockScenario::UnclearCable => Inference::new(CableType::UsbA, 0.45)
                .with_bounding_box(bbox(0.3, 0.4, 0.4, 0.2))
                .with_candidate(CableType::MiniUsb, 0.42)
                .with_candidate(CableType::MicroUsb, 0.38),
        }
    }
}

/// Forced failure modes.
#[derive(Clone, Debug)]
pub enum MockFailure {
    NoDetection,
    Processing(String),
}

/// Deterministic backend with canned answers.
///
/// Answers are keyed by the SHA-256 of the encoded image bytes; unknown
/// images get the default inference.
pub struct MockBackend {
    results: HashMap<[u8; 32], Inference>,
    default: Inference,
    failure: Option<MockFailure>,
    delay: Duration,
    ready: bool,
    calls: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            results: HashMap::new(),
            default: Inference::new(CableType::UsbC, 0.85)
                .with_bounding_box(BoundingBox::clamped(0.25, 0.35, 0.5, 0.3)),
            failure: None,
            delay: Duration::ZERO,
            ready: true,
            calls: AtomicUsize::new(0),
        }
    }

    /// Answer every unknown image with `inference`.
    pub fn with_default(mut self, inference: Inference) -> Self {
        self.default = inference;
        self
    }

    /// Answer the image whose encoded bytes are `image` with `inference`.
    pub fn with_result_for(mut self, image: &[u8], inference: Inference) -> Self {
        self.results.insert(Sha256::digest(image).into(), inference);
        self
    }

    pub fn with_failure(mut self, failure: MockFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Simulated inference latency per call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Report the model as still loading.
    pub fn not_ready(mut self) -> Self {
        self.ready = false;
        self
    }

    /// Number of `infer` calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifierBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn infer(&self, image: &ImageInput) -> Result<Inference, DetectError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        match &self.failure {
            Some(MockFailure::NoDetection) => return Err(DetectError::NoDetectionFound),
            Some(MockFailure::Processing(cause)) => {
                return Err(DetectError::processing(anyhow!("{}", cause)))
            }
            None => {}
        }

        Ok(self
            .results
            .get(&image.fingerprint())
            .unwrap_or(&self.default)
            .clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic;

    #[test]
    fn answers_by_fingerprint_then_default() {
        let known = synthetic::cable_image(CableType::Lightning, 8, 8, 1).unwrap();
        let other = synthetic::cable_image(CableType::Lightning, 8, 8, 2).unwrap();
        let backend = MockBackend::new()
            .with_result_for(&known, MockScenario::LightningPartial.inference());

        let hit = backend.infer(&ImageInput::from_bytes(&known).unwrap()).unwrap();
        assert_eq!(hit.cable_type, CableType::Lightning);
        assert_eq!(hit.confidence, 0.72);

        let miss = backend.infer(&ImageInput::from_bytes(&other).unwrap()).unwrap();
        assert_eq!(miss.cable_type, CableType::UsbC);
        assert_eq!(miss.confidence, 0.85);
        assert_eq!(backend.calls(), 2);
    }

    #[test]
    fn forced_failures() {
        let png = synthetic::cable_image(CableType::UsbA, 8, 8, 0).unwrap();
        let input = ImageInput::from_bytes(&png).unwrap();

        let backend = MockBackend::new().with_failure(MockFailure::NoDetection);
        assert!(matches!(
            backend.infer(&input),
            Err(DetectError::NoDetectionFound)
        ));

        let backend =
            MockBackend::new().with_failure(MockFailure::Processing("driver crashed".into()));
        let err = backend.infer(&input).unwrap_err();
        assert!(err.to_string().contains("driver crashed"));
    }

    #[test]
    fn scenarios_carry_alternatives() {
        let unclear = MockScenario::UnclearCable.inference();
        assert_eq!(unclear.candidates.len(), 2);
        assert_eq!(unclear.candidates[0].cable_type(), CableType::MiniUsb);
        assert!(unclear.candidates[0].bounding_box().is_some());
    }
}

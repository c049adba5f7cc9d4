use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use tokio::task::JoinHandle;

use crate::config::{DetectorConfig, DEFAULT_CONFIDENCE_THRESHOLD};
use crate::input::ImageInput;

use super::backend::{ClassifierBackend, Inference};
use super::error::DetectError;
use super::ranking::{self, DEFAULT_MAX_ALTERNATIVES};
use super::registry::BackendRegistry;
use super::result::{unit_confidence, DetectionResult};

const READY_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Confidence-gated classification service.
///
/// Wraps one backend. Every call validates its input, runs inference on the
/// blocking pool, and applies the admission gate before a [`DetectionResult`]
/// is built, so a below-threshold classification never produces a result.
/// The threshold is the only mutable setting and only affects later calls.
pub struct Classifier {
    backend: Arc<dyn ClassifierBackend>,
    threshold: AtomicU32,
    max_alternatives: usize,
}

type InferenceTask = JoinHandle<(Result<Inference, DetectError>, Duration)>;

impl Classifier {
    pub fn new(backend: Arc<dyn ClassifierBackend>) -> Self {
        Self {
            backend,
            threshold: AtomicU32::new(DEFAULT_CONFIDENCE_THRESHOLD.to_bits()),
            max_alternatives: DEFAULT_MAX_ALTERNATIVES,
        }
    }

    /// Classifier over the configured default backend.
    pub fn from_config(config: &DetectorConfig) -> anyhow::Result<Self> {
        let registry = BackendRegistry::from_config(config)?;
        let backend = registry
            .default_backend()
            .ok_or_else(|| anyhow!("no classifier backend registered"))?;
        let classifier = Self::new(backend).with_max_alternatives(config.backend.max_alternatives);
        classifier.set_confidence_threshold(config.confidence_threshold);
        Ok(classifier)
    }

    pub fn with_max_alternatives(mut self, max_alternatives: usize) -> Self {
        self.max_alternatives = max_alternatives;
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn is_ready(&self) -> bool {
        self.backend.is_ready()
    }

    pub fn confidence_threshold(&self) -> f32 {
        f32::from_bits(self.threshold.load(Ordering::Acquire))
    }

    /// Clamped into [0, 1]. NaN is ignored.
    pub fn set_confidence_threshold(&self, threshold: f32) {
        if threshold.is_nan() {
            log::warn!("ignoring NaN confidence threshold");
            return;
        }
        let threshold = threshold.clamp(0.0, 1.0);
        self.threshold.store(threshold.to_bits(), Ordering::Release);
    }

    /// Run the backend warm-up hook on the blocking pool.
    pub async fn warm_up(&self) -> Result<(), DetectError> {
        let backend = Arc::clone(&self.backend);
        tokio::task::spawn_blocking(move || backend.warm_up())
            .await
            .map_err(|e| DetectError::processing(anyhow!("warm-up task failed: {}", e)))?
    }

    /// Wait at most `timeout` for the backend to report ready.
    pub async fn wait_until_ready(&self, timeout: Duration) -> Result<(), DetectError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.backend.is_ready() {
                return Ok(());
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(DetectError::ModelNotLoaded);
            }
            tokio::time::sleep(READY_POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    /// Classify encoded image bytes with the current threshold.
    pub async fn classify(&self, image: &[u8]) -> Result<DetectionResult, DetectError> {
        self.classify_with_threshold(image, self.confidence_threshold())
            .await
    }

    /// Classify with an explicit admission threshold for this call only.
    pub async fn classify_with_threshold(
        &self,
        image: &[u8],
        threshold: f32,
    ) -> Result<DetectionResult, DetectError> {
        let input = ImageInput::from_bytes(image)?;
        self.classify_input(input, threshold).await
    }

    pub async fn classify_input(
        &self,
        input: ImageInput,
        threshold: f32,
    ) -> Result<DetectionResult, DetectError> {
        let task = self.spawn_inference(input)?;
        self.finish(task, threshold).await
    }

    /// Classify, giving up once `timeout` elapses.
    pub async fn classify_with_timeout(
        &self,
        image: &[u8],
        timeout: Duration,
    ) -> Result<DetectionResult, DetectError> {
        tokio::time::timeout(timeout, self.classify(image))
            .await
            .map_err(|_| DetectError::TimedOut(timeout))?
    }

    /// Classify several images concurrently. Results keep input order.
    pub async fn classify_batch<I>(&self, images: I) -> Vec<Result<DetectionResult, DetectError>>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        let threshold = self.confidence_threshold();
        let tasks: Vec<Result<InferenceTask, DetectError>> = images
            .into_iter()
            .map(|image| {
                ImageInput::from_bytes(image.as_ref()).and_then(|input| self.spawn_inference(input))
            })
            .collect();

        let mut results = Vec::with_capacity(tasks.len());
        for task in tasks {
            results.push(match task {
                Ok(task) => self.finish(task, threshold).await,
                Err(err) => Err(err),
            });
        }
        results
    }

    fn spawn_inference(&self, input: ImageInput) -> Result<InferenceTask, DetectError> {
        if !self.backend.is_ready() {
            return Err(DetectError::ModelNotLoaded);
        }
        let backend = Arc::clone(&self.backend);
        Ok(tokio::task::spawn_blocking(move || {
            log::debug!(
                "classifying {} ({}x{} {:?})",
                input.fingerprint_hex(),
                input.width(),
                input.height(),
                input.format()
            );
            let started = Instant::now();
            let inference = backend.infer(&input);
            (inference, started.elapsed())
        }))
    }

    async fn finish(
        &self,
        task: InferenceTask,
        threshold: f32,
    ) -> Result<DetectionResult, DetectError> {
        let (inference, elapsed) = task
            .await
            .map_err(|e| DetectError::processing(anyhow!("inference task failed: {}", e)))?;
        self.admit(inference?, threshold, elapsed)
    }

    /// Per-call threshold as applied by the gate: clamped into [0, 1], NaN
    /// falls back to the configured threshold.
    fn gate_threshold(&self, threshold: f32) -> f32 {
        if threshold.is_nan() {
            log::warn!("NaN per-call threshold, using configured threshold");
            return self.confidence_threshold();
        }
        threshold.clamp(0.0, 1.0)
    }

    fn admit(
        &self,
        inference: Inference,
        threshold: f32,
        processing_time: Duration,
    ) -> Result<DetectionResult, DetectError> {
        let threshold = self.gate_threshold(threshold);
        let confidence = unit_confidence(inference.confidence).ok_or_else(|| {
            DetectError::processing(anyhow!(
                "{} backend produced non-finite confidence",
                self.backend.name()
            ))
        })?;

        if confidence < threshold {
            log::debug!(
                "rejected {} at {:.2} (threshold {:.2})",
                inference.cable_type,
                confidence,
                threshold
            );
            return Err(DetectError::ConfidenceTooLow(confidence));
        }

        let alternatives = ranking::normalize(
            inference.cable_type,
            confidence,
            inference.candidates,
            self.max_alternatives,
        );
        DetectionResult::new(
            inference.cable_type,
            confidence,
            inference.bounding_box,
            alternatives,
            processing_time,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cable::CableType;
    use crate::detect::backends::{MockBackend, MockFailure, MockScenario, SimulatedBackend};
    use crate::synthetic;

    fn png(seed: u64) -> Vec<u8> {
        synthetic::cable_image(CableType::UsbC, 24, 24, seed).unwrap()
    }

    fn classifiers() -> Vec<Classifier> {
        vec![
            Classifier::new(Arc::new(SimulatedBackend::new().with_seed(11).warmed())),
            Classifier::new(Arc::new(
                MockBackend::new().with_default(MockScenario::LightningPartial.inference()),
            )),
        ]
    }

    #[tokio::test]
    async fn admission_gate_holds_for_every_backend() {
        for classifier in classifiers() {
            for (i, threshold) in [0.0, 0.5, 0.6, 0.72, 0.8, 0.9, 1.0].into_iter().enumerate() {
                match classifier
                    .classify_with_threshold(&png(i as u64), threshold)
                    .await
                {
                    Ok(result) => {
                        assert!(result.confidence() >= threshold);
                        assert!((0.0..=1.0).contains(&result.confidence()));
                    }
                    Err(DetectError::ConfidenceTooLow(c)) => assert!(c < threshold),
                    Err(other) => panic!("{}: unexpected {}", classifier.backend_name(), other),
                }
            }
        }
    }

    #[tokio::test]
    async fn out_of_range_thresholds_never_open_the_gate() {
        let classifier = Classifier::new(Arc::new(
            MockBackend::new().with_default(Inference::new(CableType::UsbC, 0.1)),
        ));

        let err = classifier
            .classify_with_threshold(&png(0), f32::NAN)
            .await
            .unwrap_err();
        assert!(matches!(err, DetectError::ConfidenceTooLow(c) if c == 0.1));

        let err = classifier
            .classify_with_threshold(&png(1), 7.5)
            .await
            .unwrap_err();
        assert!(matches!(err, DetectError::ConfidenceTooLow(_)));

        let result = classifier
            .classify_with_threshold(&png(2), -3.0)
            .await
            .unwrap();
        assert_eq!(result.confidence(), 0.1);

        classifier.set_confidence_threshold(0.05);
        let result = classifier
            .classify_with_threshold(&png(3), f32::NAN)
            .await
            .unwrap();
        assert!(result.confidence() >= classifier.confidence_threshold());
    }

    #[tokio::test]
    async fn alternatives_obey_contract_for_every_backend() {
        for classifier in classifiers() {
            for seed in 0..20 {
                let Ok(result) = classifier.classify_with_threshold(&png(seed), 0.0).await else {
                    panic!("threshold 0 never rejects");
                };
                let alts = result.alternatives();
                assert!(alts.len() <= DEFAULT_MAX_ALTERNATIVES);
                for pair in alts.windows(2) {
                    assert!(pair[0].confidence() >= pair[1].confidence());
                    assert_ne!(pair[0].cable_type(), pair[1].cable_type());
                }
                for alt in alts {
                    assert_ne!(alt.cable_type(), result.detected_type());
                    assert!(alt.confidence() < result.confidence());
                }
            }
        }
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_backend() {
        let mock = Arc::new(MockBackend::new());
        let classifier = Classifier::new(mock.clone());
        let err = classifier.classify(&[]).await.unwrap_err();
        assert!(matches!(err, DetectError::InvalidImageData(_)));
        let err = classifier.classify(&[0xFF, 0xD8, 0xFF, 0xE0]).await.unwrap_err();
        assert!(matches!(err, DetectError::InvalidImageData(_)));
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn not_ready_backend_reports_model_not_loaded() {
        let classifier = Classifier::new(Arc::new(MockBackend::new().not_ready()));
        let err = classifier.classify(&png(0)).await.unwrap_err();
        assert!(matches!(err, DetectError::ModelNotLoaded));
        assert!(err.is_retryable());

        let err = classifier
            .wait_until_ready(Duration::from_millis(30))
            .await
            .unwrap_err();
        assert!(matches!(err, DetectError::ModelNotLoaded));
    }

    #[tokio::test]
    async fn warm_up_makes_simulated_backend_ready() {
        let classifier = Classifier::new(Arc::new(
            SimulatedBackend::new().with_warm_up_delay(Duration::from_millis(10)),
        ));
        assert!(!classifier.is_ready());
        classifier.warm_up().await.unwrap();
        classifier
            .wait_until_ready(Duration::from_millis(10))
            .await
            .unwrap();
        assert!(classifier.classify_with_threshold(&png(1), 0.0).await.is_ok());
    }

    #[tokio::test]
    async fn threshold_changes_apply_to_later_calls() {
        let classifier = Classifier::new(Arc::new(MockBackend::new()));
        assert_eq!(classifier.confidence_threshold(), 0.6);
        assert!(classifier.classify(&png(0)).await.is_ok());

        classifier.set_confidence_threshold(0.9);
        let err = classifier.classify(&png(0)).await.unwrap_err();
        assert!(matches!(err, DetectError::ConfidenceTooLow(c) if c == 0.85));

        classifier.set_confidence_threshold(f32::NAN);
        assert_eq!(classifier.confidence_threshold(), 0.9);
        classifier.set_confidence_threshold(3.0);
        assert_eq!(classifier.confidence_threshold(), 1.0);
    }

    #[tokio::test]
    async fn backend_failures_propagate_unchanged() {
        let classifier =
            Classifier::new(Arc::new(MockBackend::new().with_failure(MockFailure::NoDetection)));
        let err = classifier.classify(&png(0)).await.unwrap_err();
        assert!(matches!(err, DetectError::NoDetectionFound));
        assert!(err.is_no_detection());
    }

    #[tokio::test]
    async fn caller_timeout_maps_to_timed_out() {
        let classifier = Classifier::new(Arc::new(
            MockBackend::new().with_delay(Duration::from_millis(200)),
        ));
        let err = classifier
            .classify_with_timeout(&png(0), Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, DetectError::TimedOut(_)));
    }

    #[tokio::test]
    async fn batch_keeps_input_order() {
        let clear = png(100);
        let classifier = Classifier::new(Arc::new(
            MockBackend::new()
                .with_result_for(&clear, MockScenario::UsbCClear.inference())
                .with_default(MockScenario::UnclearCable.inference()),
        ));
        let results = classifier
            .classify_batch(vec![png(1), Vec::new(), clear.clone()])
            .await;
        assert_eq!(results.len(), 3);
        assert!(matches!(results[0], Err(DetectError::ConfidenceTooLow(_))));
        assert!(matches!(results[1], Err(DetectError::InvalidImageData(_))));
        let clear_result = results[2].as_ref().unwrap();
        assert_eq!(clear_result.detected_type(), CableType::UsbC);
        assert_eq!(clear_result.alternatives().len(), 1);
    }
}

//! Detection session: capture → classify → gate → store.

use std::sync::Arc;

use anyhow::Result;

use crate::capture::{self, CaptureError, ImageSource, SharedSource};
use crate::config::DetectorConfig;
use crate::detect::{Classifier, DetectError, DetectionResult};
use crate::store::ResultStore;

/// What the user sees after one detection attempt.
///
/// A below-threshold classification is `NoConfidentDetection`, never a
/// stored result.
#[derive(Debug)]
pub enum DetectionOutcome {
    /// Admitted and stored.
    Detected(Arc<DetectionResult>),
    NoConfidentDetection { confidence: f32 },
    NoCableFound,
    CaptureFailed(CaptureError),
    Failed(DetectError),
}

impl DetectionOutcome {
    pub fn result(&self) -> Option<&Arc<DetectionResult>> {
        match self {
            DetectionOutcome::Detected(result) => Some(result),
            _ => None,
        }
    }

    pub fn is_detected(&self) -> bool {
        matches!(self, DetectionOutcome::Detected(_))
    }

    /// True when trying again with a new capture makes sense.
    pub fn can_retry(&self) -> bool {
        match self {
            DetectionOutcome::Detected(_) => false,
            DetectionOutcome::NoConfidentDetection { .. } | DetectionOutcome::NoCableFound => true,
            DetectionOutcome::CaptureFailed(err) => !matches!(err, CaptureError::PermissionDenied),
            DetectionOutcome::Failed(err) => err.is_retryable(),
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            DetectionOutcome::Detected(result) => format!(
                "Detected {} ({})",
                result.detected_type(),
                result.confidence_percentage()
            ),
            DetectionOutcome::NoConfidentDetection { .. } => {
                "No cable detected with confidence. Try again.".to_string()
            }
            DetectionOutcome::NoCableFound => "No USB cable detected in the image.".to_string(),
            DetectionOutcome::CaptureFailed(err) => err.to_string(),
            DetectionOutcome::Failed(err) => err.to_string(),
        }
    }
}

pub struct DetectionSession {
    classifier: Classifier,
    store: Arc<ResultStore>,
}

impl DetectionSession {
    pub fn new(classifier: Classifier, store: Arc<ResultStore>) -> Self {
        Self { classifier, store }
    }

    pub fn from_config(config: &DetectorConfig) -> Result<Self> {
        Ok(Self::new(
            Classifier::from_config(config)?,
            Arc::new(ResultStore::from_config(config)),
        ))
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn store(&self) -> &Arc<ResultStore> {
        &self.store
    }

    /// Classify one image and store it if admitted.
    pub async fn detect(&self, image: &[u8]) -> DetectionOutcome {
        let classified = self.classifier.classify(image).await;
        self.record(classified)
    }

    /// Capture from `source` on the blocking pool, then
    /// [`DetectionSession::detect`].
    ///
    /// A capture error aborts before classification.
    pub async fn capture_and_detect<S>(&self, source: &SharedSource<S>) -> DetectionOutcome
    where
        S: ImageSource + 'static,
    {
        match capture::capture(source).await {
            Ok(image) => self.detect(&image).await,
            Err(err) => DetectionOutcome::CaptureFailed(err),
        }
    }

    /// Classify several images concurrently; outcomes keep input order.
    pub async fn detect_batch<I>(&self, images: I) -> Vec<DetectionOutcome>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        self.classifier
            .classify_batch(images)
            .await
            .into_iter()
            .map(|classified| self.record(classified))
            .collect()
    }

    fn record(&self, classified: Result<DetectionResult, DetectError>) -> DetectionOutcome {
        match classified {
            Ok(result) => {
                let stored = self.store.add(result);
                log::info!(
                    "detected {} at {} in {:?}",
                    stored.detected_type(),
                    stored.confidence_percentage(),
                    stored.processing_time()
                );
                DetectionOutcome::Detected(stored)
            }
            Err(DetectError::ConfidenceTooLow(confidence)) => {
                DetectionOutcome::NoConfidentDetection { confidence }
            }
            Err(DetectError::NoDetectionFound) => DetectionOutcome::NoCableFound,
            Err(err) => {
                log::warn!("classification failed: {}", err);
                DetectionOutcome::Failed(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cable::CableType;
    use crate::capture::{shared, MockCamera};
    use crate::detect::{MockBackend, MockFailure, MockScenario};

    fn session(backend: MockBackend) -> DetectionSession {
        DetectionSession::new(
            Classifier::new(Arc::new(backend)),
            Arc::new(ResultStore::default()),
        )
    }

    #[tokio::test]
    async fn admitted_result_is_stored() {
        let session = session(MockBackend::new().with_default(MockScenario::UsbCClear.inference()));
        let camera = shared(MockCamera::new(CableType::UsbC).ready().unwrap());

        let outcome = session.capture_and_detect(&camera).await;
        assert!(outcome.is_detected());
        assert_eq!(outcome.user_message(), "Detected USB-C (95%)");
        assert_eq!(session.store().len(), 1);
        assert!(Arc::ptr_eq(
            outcome.result().unwrap(),
            &session.store().featured().unwrap()
        ));
    }

    #[tokio::test]
    async fn low_confidence_is_distinct_and_not_stored() {
        let session =
            session(MockBackend::new().with_default(MockScenario::UnclearCable.inference()));
        let camera = shared(MockCamera::new(CableType::UsbA).ready().unwrap());

        let outcome = session.capture_and_detect(&camera).await;
        assert!(matches!(
            outcome,
            DetectionOutcome::NoConfidentDetection { confidence } if confidence == 0.45
        ));
        assert!(outcome.can_retry());
        assert!(session.store().is_empty());
    }

    #[tokio::test]
    async fn capture_error_skips_classification() {
        let backend = Arc::new(MockBackend::new());
        let session = DetectionSession::new(
            Classifier::new(backend.clone()),
            Arc::new(ResultStore::default()),
        );
        let camera = shared(MockCamera::new(CableType::UsbC));

        let outcome = session.capture_and_detect(&camera).await;
        assert!(matches!(
            outcome,
            DetectionOutcome::CaptureFailed(CaptureError::PermissionDenied)
        ));
        assert!(!outcome.can_retry());
        assert_eq!(backend.calls(), 0);
        assert!(session.store().is_empty());
    }

    #[tokio::test]
    async fn no_detection_and_failures_map_to_outcomes() {
        let session = session(MockBackend::new().with_failure(MockFailure::NoDetection));
        let camera = shared(MockCamera::new(CableType::UsbC).ready().unwrap());
        assert!(matches!(
            session.capture_and_detect(&camera).await,
            DetectionOutcome::NoCableFound
        ));

        let outcome = session.detect(b"not an image").await;
        assert!(matches!(
            outcome,
            DetectionOutcome::Failed(DetectError::InvalidImageData(_))
        ));
        assert!(!outcome.can_retry());
    }
}

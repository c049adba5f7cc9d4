use std::time::Duration;

use thiserror::Error;

/// Classification failures.
///
/// `ConfidenceTooLow` and `NoDetectionFound` are expected outcomes, not system
/// faults; see [`DetectError::is_no_detection`].
#[derive(Debug, Error)]
pub enum DetectError {
    /// Empty, truncated or otherwise undecodable input.
    #[error("the image data is invalid or corrupted: {0}")]
    InvalidImageData(String),

    /// Recognised container that this build cannot decode.
    #[error("image format is not supported: {0}")]
    UnsupportedImageFormat(String),

    /// Inference resource has not finished warming up.
    #[error("classification model is not loaded")]
    ModelNotLoaded,

    /// Classification ran but did not clear the admission gate.
    #[error("detection confidence too low ({0:.2})")]
    ConfidenceTooLow(f32),

    /// The backend produced no candidate at all.
    #[error("no USB cable detected in the image")]
    NoDetectionFound,

    /// Underlying inference runtime failure.
    #[error("image processing failed: {0}")]
    ProcessingFailed(#[source] anyhow::Error),

    /// A caller-imposed deadline elapsed.
    #[error("classification timed out after {0:?}")]
    TimedOut(Duration),
}

impl DetectError {
    pub fn processing(err: impl Into<anyhow::Error>) -> Self {
        DetectError::ProcessingFailed(err.into())
    }

    /// True when retrying the same input may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DetectError::ModelNotLoaded
                | DetectError::TimedOut(_)
                | DetectError::ProcessingFailed(_)
        )
    }

    /// True for "nothing confident in this image" outcomes.
    pub fn is_no_detection(&self) -> bool {
        matches!(
            self,
            DetectError::ConfidenceTooLow(_) | DetectError::NoDetectionFound
        )
    }
}

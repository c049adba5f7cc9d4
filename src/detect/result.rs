use std::time::{Duration, SystemTime};

use serde::Serialize;

use crate::cable::CableType;

use super::error::DetectError;
use super::geometry::BoundingBox;
use super::ranking;

/// Lower bound of the high-confidence band.
pub const HIGH_CONFIDENCE: f32 = 0.8;
/// Lower bound of the medium-confidence band.
pub const MEDIUM_CONFIDENCE: f32 = 0.6;

/// Confidence band. Exactly one band holds for any confidence in [0, 1].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

impl ConfidenceBand {
    pub fn from_confidence(confidence: f32) -> Self {
        if confidence >= HIGH_CONFIDENCE {
            ConfidenceBand::High
        } else if confidence >= MEDIUM_CONFIDENCE {
            ConfidenceBand::Medium
        } else {
            ConfidenceBand::Low
        }
    }
}

/// Clamp a finite score into [0, 1]. Returns `None` for NaN or infinities.
pub fn unit_confidence(confidence: f32) -> Option<f32> {
    confidence
        .is_finite()
        .then(|| confidence.clamp(0.0, 1.0))
}

/// Secondary candidate reported next to the primary classification.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AlternativeDetection {
    cable_type: CableType,
    confidence: f32,
    bounding_box: Option<BoundingBox>,
}

impl AlternativeDetection {
    pub fn new(cable_type: CableType, confidence: f32, bounding_box: Option<BoundingBox>) -> Self {
        Self {
            cable_type,
            confidence,
            bounding_box,
        }
    }

    pub fn cable_type(&self) -> CableType {
        self.cable_type
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.bounding_box
    }

    pub(crate) fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }
}

/// One classification event.
///
/// Values are immutable once built. Construction enforces the alternative
/// invariants: every alternative has a different type than the primary, a
/// strictly lower confidence, no two share a type, and the list is ordered by
/// confidence descending.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DetectionResult {
    detected_type: CableType,
    confidence: f32,
    bounding_box: Option<BoundingBox>,
    alternatives: Vec<AlternativeDetection>,
    processing_time: Duration,
    detected_at: SystemTime,
}

impl DetectionResult {
    pub fn new(
        detected_type: CableType,
        confidence: f32,
        bounding_box: Option<BoundingBox>,
        alternatives: Vec<AlternativeDetection>,
        processing_time: Duration,
    ) -> Result<Self, DetectError> {
        let confidence = unit_confidence(confidence).ok_or_else(|| {
            DetectError::processing(anyhow::anyhow!(
                "classifier produced non-finite confidence {}",
                confidence
            ))
        })?;
        let alternatives =
            ranking::normalize(detected_type, confidence, alternatives, usize::MAX);
        Ok(Self {
            detected_type,
            confidence,
            bounding_box,
            alternatives,
            processing_time,
            detected_at: SystemTime::now(),
        })
    }

    /// Override the detection timestamp (replayed or imported results).
    pub fn with_detected_at(mut self, detected_at: SystemTime) -> Self {
        self.detected_at = detected_at;
        self
    }

    pub fn detected_type(&self) -> CableType {
        self.detected_type
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.bounding_box
    }

    pub fn alternatives(&self) -> &[AlternativeDetection] {
        &self.alternatives
    }

    pub fn processing_time(&self) -> Duration {
        self.processing_time
    }

    pub fn detected_at(&self) -> SystemTime {
        self.detected_at
    }

    pub fn band(&self) -> ConfidenceBand {
        ConfidenceBand::from_confidence(self.confidence)
    }

    pub fn is_high_confidence(&self) -> bool {
        self.band() == ConfidenceBand::High
    }

    pub fn is_medium_confidence(&self) -> bool {
        self.band() == ConfidenceBand::Medium
    }

    pub fn is_low_confidence(&self) -> bool {
        self.band() == ConfidenceBand::Low
    }

    /// Confidence as a rounded percentage, e.g. "95%".
    pub fn confidence_percentage(&self) -> String {
        format!("{:.0}%", self.confidence * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alt(cable_type: CableType, confidence: f32) -> AlternativeDetection {
        AlternativeDetection::new(cable_type, confidence, None)
    }

    #[test]
    fn bands_partition_unit_interval() {
        for step in 0..=100 {
            let c = step as f32 / 100.0;
            let band = ConfidenceBand::from_confidence(c);
            let expected = if c >= 0.8 {
                ConfidenceBand::High
            } else if c >= 0.6 {
                ConfidenceBand::Medium
            } else {
                ConfidenceBand::Low
            };
            assert_eq!(band, expected, "confidence {}", c);
        }
    }

    #[test]
    fn construction_enforces_alternative_invariants() {
        let result = DetectionResult::new(
            CableType::UsbC,
            0.7,
            None,
            vec![
                alt(CableType::Lightning, 0.2),
                alt(CableType::UsbC, 0.3),
                alt(CableType::UsbA, 0.5),
                alt(CableType::Lightning, 0.4),
                alt(CableType::Thunderbolt, 0.9),
            ],
            Duration::from_millis(12),
        )
        .unwrap();

        let alts: Vec<_> = result
            .alternatives()
            .iter()
            .map(|a| (a.cable_type(), a.confidence()))
            .collect();
        assert_eq!(
            alts,
            vec![(CableType::UsbA, 0.5), (CableType::Lightning, 0.4)]
        );
    }

    #[test]
    fn clamps_confidence_and_rejects_nan() {
        let result =
            DetectionResult::new(CableType::UsbA, 1.4, None, Vec::new(), Duration::ZERO).unwrap();
        assert_eq!(result.confidence(), 1.0);
        assert!(result.is_high_confidence());

        let err = DetectionResult::new(CableType::UsbA, f32::NAN, None, Vec::new(), Duration::ZERO)
            .unwrap_err();
        assert!(matches!(err, DetectError::ProcessingFailed(_)));
    }

    #[test]
    fn exactly_one_band_predicate_holds() {
        for c in [0.0, 0.59, 0.6, 0.79, 0.8, 1.0] {
            let r = DetectionResult::new(CableType::MiniUsb, c, None, Vec::new(), Duration::ZERO)
                .unwrap();
            let held = [
                r.is_high_confidence(),
                r.is_medium_confidence(),
                r.is_low_confidence(),
            ];
            assert_eq!(held.iter().filter(|b| **b).count(), 1, "confidence {}", c);
        }
    }

    #[test]
    fn formats_percentage() {
        let r = DetectionResult::new(CableType::UsbC, 0.95, None, Vec::new(), Duration::ZERO)
            .unwrap();
        assert_eq!(r.confidence_percentage(), "95%");
    }
}

use crate::cable::CableType;
use crate::input::ImageInput;

use super::error::DetectError;
use super::geometry::BoundingBox;
use super::result::AlternativeDetection;

/// Raw backend output, before the admission gate.
#[derive(Clone, Debug, PartialEq)]
pub struct Inference {
    pub cable_type: CableType,
    pub confidence: f32,
    pub bounding_box: Option<BoundingBox>,
    /// Next-best candidates in any order. The classifier normalises them.
    pub candidates: Vec<AlternativeDetection>,
}

impl Inference {
    pub fn new(cable_type: CableType, confidence: f32) -> Self {
        Self {
            cable_type,
            confidence,
            bounding_box: None,
            candidates: Vec::new(),
        }
    }

    pub fn with_bounding_box(mut self, bounding_box: BoundingBox) -> Self {
        self.bounding_box = Some(bounding_box);
        self
    }

    pub fn with_candidate(mut self, cable_type: CableType, confidence: f32) -> Self {
        self.candidates.push(AlternativeDetection::new(
            cable_type,
            confidence,
            self.bounding_box,
        ));
        self
    }
}

/// Classifier backend trait.
///
/// Implementations turn one validated image into one primary classification.
/// `infer` may be called concurrently from several blocking-pool threads and
/// must not carry state from one call into the next. Confidence gating and
/// alternative normalisation happen in [`super::Classifier`], not here.
pub trait ClassifierBackend: Send + Sync {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// True once the backend can serve `infer`.
    fn is_ready(&self) -> bool {
        true
    }

    /// Run inference on an image.
    fn infer(&self, image: &ImageInput) -> Result<Inference, DetectError>;

    /// Optional warm-up hook. May block.
    fn warm_up(&self) -> Result<(), DetectError> {
        Ok(())
    }
}

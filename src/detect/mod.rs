//! Detection pipeline: backends, admission gate, ranking and result types.

mod backend;
pub mod backends;
mod classifier;
mod error;
mod geometry;
pub mod ranking;
mod registry;
mod result;

pub use backend::{ClassifierBackend, Inference};
pub use backends::{MockBackend, MockFailure, MockScenario, SimulatedBackend};
pub use classifier::Classifier;
pub use error::DetectError;
pub use geometry::BoundingBox;
pub use registry::BackendRegistry;
pub use result::{
    unit_confidence, AlternativeDetection, ConfidenceBand, DetectionResult, HIGH_CONFIDENCE,
    MEDIUM_CONFIDENCE,
};

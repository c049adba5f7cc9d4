//! USB cable detection pipeline
//!
//! Classifies camera captures into one of seven USB cable types, gates them on
//! confidence and keeps the most recent admitted detections in a bounded store.
//!
//! # Architecture
//!
//! The pipeline holds four guarantees by construction:
//!
//! 1. **Gated admission**: a classification below the confidence threshold
//!    is reported as an error and never becomes a stored result.
//! 2. **Consistent alternatives**: alternatives never repeat the primary type
//!    or each other, always score strictly lower, and are ordered descending.
//! 3. **Bounded history**: the store holds at most its capacity, evicting the
//!    oldest entry first regardless of confidence.
//! 4. **Backend independence**: simulated, mock and model backends share one
//!    interface and the same gate.
//!
//! # Module Structure
//!
//! - `cable`: cable type catalogue and display metadata
//! - `capture`: image sources (mock camera, local files)
//! - `config`: file + environment configuration
//! - `detect`: classifier, backends, results and ranking
//! - `input`: validated image bytes
//! - `session`: capture → classify → store glue
//! - `store`: bounded result set and its derived views
//! - `synthetic`: generated cable images for demos and tests

pub mod cable;
pub mod capture;
pub mod config;
pub mod detect;
pub mod input;
pub mod session;
pub mod store;
pub mod synthetic;

pub use cable::{Cable, CableCondition, CableLength, CableType};
pub use capture::{CaptureError, FileImageSource, ImageSource, MockCamera, SharedSource};
pub use config::DetectorConfig;
pub use detect::{
    AlternativeDetection, BackendRegistry, BoundingBox, Classifier, ClassifierBackend,
    ConfidenceBand, DetectError, DetectionResult, Inference, MockBackend, MockScenario,
    SimulatedBackend,
};
pub use input::ImageInput;
pub use session::{DetectionOutcome, DetectionSession};
pub use store::{ResultStore, StoreSummary};

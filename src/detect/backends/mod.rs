pub mod mock;
pub mod simulated;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use mock::{MockBackend, MockFailure, MockScenario};
pub use simulated::SimulatedBackend;

#[cfg(feature = "backend-tract")]
pub use tract::TractBackend;

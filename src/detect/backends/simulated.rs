use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

use crate::cable::CableType;
use crate::detect::backend::{ClassifierBackend, Inference};
use crate::detect::error::DetectError;
use crate::detect::ranking::{self, DEFAULT_MAX_ALTERNATIVES};
use crate::input::ImageInput;

/// Relative draw weights for the primary type.
pub const CABLE_WEIGHTS: [(CableType, u32); 7] = [
    (CableType::UsbC, 30),
    (CableType::Lightning, 25),
    (CableType::UsbA, 20),
    (CableType::MicroUsb, 15),
    (CableType::Usb30, 8),
    (CableType::MiniUsb, 1),
    (CableType::Thunderbolt, 1),
];

pub const MIN_SIMULATED_CONFIDENCE: f32 = 0.5;
pub const MAX_SIMULATED_CONFIDENCE: f32 = 0.95;
pub const DEFAULT_WARM_UP: Duration = Duration::from_millis(500);

/// Weighted-random stand-in for a trained model.
///
/// Not ready until [`ClassifierBackend::warm_up`] has run. With a seed, each
/// call derives its RNG from the seed and the image fingerprint, so repeated
/// calls on the same image agree and calls never share RNG state.
pub struct SimulatedBackend {
    seed: Option<u64>,
    max_alternatives: usize,
    warm_up_delay: Duration,
    ready: AtomicBool,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self {
            seed: None,
            max_alternatives: DEFAULT_MAX_ALTERNATIVES,
            warm_up_delay: DEFAULT_WARM_UP,
            ready: AtomicBool::new(false),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_max_alternatives(mut self, max_alternatives: usize) -> Self {
        self.max_alternatives = max_alternatives;
        self
    }

    pub fn with_warm_up_delay(mut self, delay: Duration) -> Self {
        self.warm_up_delay = delay;
        self
    }

    /// Skip warm-up.
    pub fn warmed(self) -> Self {
        self.ready.store(true, Ordering::Release);
        self
    }

    fn rng_for(&self, image: &ImageInput) -> StdRng {
        match self.seed {
            Some(seed) => {
                let mut hasher = Sha256::new();
                hasher.update(seed.to_le_bytes());
                hasher.update(image.fingerprint());
                StdRng::from_seed(hasher.finalize().into())
            }
            None => StdRng::from_entropy(),
        }
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn sample_type<R: Rng + ?Sized>(rng: &mut R) -> Result<CableType, DetectError> {
    let weights = WeightedIndex::new(CABLE_WEIGHTS.iter().map(|(_, w)| *w))
        .map_err(DetectError::processing)?;
    Ok(CABLE_WEIGHTS[weights.sample(rng)].0)
}

impl ClassifierBackend for SimulatedBackend {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    fn infer(&self, image: &ImageInput) -> Result<Inference, DetectError> {
        if !self.is_ready() {
            return Err(DetectError::ModelNotLoaded);
        }
        let mut rng = self.rng_for(image);

        let cable_type = sample_type(&mut rng)?;
        let confidence = rng.gen_range(MIN_SIMULATED_CONFIDENCE..=MAX_SIMULATED_CONFIDENCE);
        let bounding_box = ranking::sample_box(&mut rng);
        let count = rng.gen_range(0..=self.max_alternatives);
        let candidates = ranking::rank(cable_type, confidence, count, &mut rng);

        Ok(Inference {
            cable_type,
            confidence,
            bounding_box: Some(bounding_box),
            candidates,
        })
    }

    fn warm_up(&self) -> Result<(), DetectError> {
        if self.is_ready() {
            return Ok(());
        }
        std::thread::sleep(self.warm_up_delay);
        self.ready.store(true, Ordering::Release);
        log::info!(
            "simulated classifier ready after {:?} warm-up",
            self.warm_up_delay
        );
        Ok(())
    }
}

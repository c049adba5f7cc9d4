use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::detect::ranking::DEFAULT_MAX_ALTERNATIVES;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.6;
pub const DEFAULT_STORE_CAPACITY: usize = 20;
pub const DEFAULT_RECENT_LIMIT: usize = 5;
pub const DEFAULT_FEATURED_THRESHOLD: f32 = 0.85;
const DEFAULT_BACKEND: &str = "simulated";
const DEFAULT_WARM_UP_MS: u64 = 500;
const DEFAULT_INPUT_SIZE: u32 = 224;

/// Backend names this crate knows how to build.
pub const KNOWN_BACKENDS: [&str; 3] = ["simulated", "mock", "tract"];

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    confidence_threshold: Option<f32>,
    store: Option<StoreConfigFile>,
    backend: Option<BackendConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct StoreConfigFile {
    capacity: Option<usize>,
    recent_limit: Option<usize>,
    featured_threshold: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct BackendConfigFile {
    name: Option<String>,
    max_alternatives: Option<usize>,
    warm_up_ms: Option<u64>,
    seed: Option<u64>,
    model_path: Option<PathBuf>,
    input_width: Option<u32>,
    input_height: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Admission gate for new classifications.
    pub confidence_threshold: f32,
    pub store: StoreSettings,
    pub backend: BackendSettings,
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub capacity: usize,
    pub recent_limit: usize,
    pub featured_threshold: f32,
}

#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub name: String,
    pub max_alternatives: usize,
    pub warm_up: Duration,
    pub seed: Option<u64>,
    pub model_path: Option<PathBuf>,
    pub input_width: u32,
    pub input_height: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::from_file(DetectorConfigFile::default())
    }
}

impl DetectorConfig {
    /// Defaults, then the file named by `CABLE_DETECT_CONFIG`, then env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("CABLE_DETECT_CONFIG").ok();
        Self::load_with(config_path.as_deref().map(Path::new))
    }

    /// Like [`DetectorConfig::load`] with an explicit file path.
    pub fn load_with(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => DetectorConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: DetectorConfigFile) -> Self {
        let store = file.store.unwrap_or_default();
        let backend = file.backend.unwrap_or_default();
        Self {
            confidence_threshold: file
                .confidence_threshold
                .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
            store: StoreSettings {
                capacity: store.capacity.unwrap_or(DEFAULT_STORE_CAPACITY),
                recent_limit: store.recent_limit.unwrap_or(DEFAULT_RECENT_LIMIT),
                featured_threshold: store
                    .featured_threshold
                    .unwrap_or(DEFAULT_FEATURED_THRESHOLD),
            },
            backend: BackendSettings {
                name: backend.name.unwrap_or_else(|| DEFAULT_BACKEND.to_string()),
                max_alternatives: backend
                    .max_alternatives
                    .unwrap_or(DEFAULT_MAX_ALTERNATIVES),
                warm_up: Duration::from_millis(backend.warm_up_ms.unwrap_or(DEFAULT_WARM_UP_MS)),
                seed: backend.seed,
                model_path: backend.model_path,
                input_width: backend.input_width.unwrap_or(DEFAULT_INPUT_SIZE),
                input_height: backend.input_height.unwrap_or(DEFAULT_INPUT_SIZE),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(threshold) = parse_env("CABLE_DETECT_CONFIDENCE_THRESHOLD")? {
            self.confidence_threshold = threshold;
        }
        if let Some(capacity) = parse_env("CABLE_DETECT_STORE_CAPACITY")? {
            self.store.capacity = capacity;
        }
        if let Some(limit) = parse_env("CABLE_DETECT_RECENT_LIMIT")? {
            self.store.recent_limit = limit;
        }
        if let Some(threshold) = parse_env("CABLE_DETECT_FEATURED_THRESHOLD")? {
            self.store.featured_threshold = threshold;
        }
        if let Ok(name) = std::env::var("CABLE_DETECT_BACKEND") {
            if !name.trim().is_empty() {
                self.backend.name = name.trim().to_lowercase();
            }
        }
        if let Some(max) = parse_env("CABLE_DETECT_MAX_ALTERNATIVES")? {
            self.backend.max_alternatives = max;
        }
        if let Some(ms) = parse_env::<u64>("CABLE_DETECT_WARM_UP_MS")? {
            self.backend.warm_up = Duration::from_millis(ms);
        }
        if let Some(seed) = parse_env("CABLE_DETECT_SEED")? {
            self.backend.seed = Some(seed);
        }
        if let Ok(path) = std::env::var("CABLE_DETECT_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.backend.model_path = Some(PathBuf::from(path));
            }
        }
        Ok(())
    }

    /// Checked by the loaders; call again after editing fields by hand.
    pub fn validate(&self) -> Result<()> {
        check_unit("confidence_threshold", self.confidence_threshold)?;
        check_unit("store.featured_threshold", self.store.featured_threshold)?;
        if self.store.capacity == 0 {
            return Err(anyhow!("store.capacity must be greater than zero"));
        }
        if self.store.recent_limit == 0 {
            return Err(anyhow!("store.recent_limit must be greater than zero"));
        }
        if !KNOWN_BACKENDS.contains(&self.backend.name.as_str()) {
            return Err(anyhow!(
                "backend.name '{}' is not one of {}",
                self.backend.name,
                KNOWN_BACKENDS.join(", ")
            ));
        }
        if self.backend.name == "tract" && self.backend.model_path.is_none() {
            return Err(anyhow!("backend 'tract' requires backend.model_path"));
        }
        if self.backend.input_width == 0 || self.backend.input_height == 0 {
            return Err(anyhow!("backend input size must be at least 1x1"));
        }
        Ok(())
    }
}

fn check_unit(key: &str, value: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(anyhow!("{} must be within [0, 1], got {}", key, value));
    }
    Ok(())
}

fn parse_env<T: FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("{} has an invalid value '{}'", key, raw)),
        _ => Ok(None),
    }
}

fn read_config_file(path: &Path) -> Result<DetectorConfigFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

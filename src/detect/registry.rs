use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::config::DetectorConfig;

use super::backend::ClassifierBackend;
use super::backends::{MockBackend, SimulatedBackend};

/// Registry of classifier backends.
///
/// Backends are shared as `Arc<dyn ClassifierBackend>`; `infer` takes `&self`,
/// so no extra locking is needed around them.
pub struct BackendRegistry {
    backends: BTreeMap<String, Arc<dyn ClassifierBackend>>,
    default_name: Option<String>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            backends: BTreeMap::new(),
            default_name: None,
        }
    }

    /// Registry holding every backend this build can construct, with the
    /// configured backend as default.
    pub fn from_config(config: &DetectorConfig) -> Result<Self> {
        let mut registry = Self::new();

        let mut simulated = SimulatedBackend::new()
            .with_max_alternatives(config.backend.max_alternatives)
            .with_warm_up_delay(config.backend.warm_up);
        if let Some(seed) = config.backend.seed {
            simulated = simulated.with_seed(seed);
        }
        registry.register(simulated);
        registry.register(MockBackend::new());

        #[cfg(feature = "backend-tract")]
        {
            if let Some(path) = &config.backend.model_path {
                let tract = super::backends::TractBackend::new(
                    path,
                    config.backend.input_width,
                    config.backend.input_height,
                )?;
                registry.register(tract);
            }
        }

        registry.set_default(&config.backend.name)?;
        log::info!("classifier backend: {}", config.backend.name);
        Ok(registry)
    }

    /// Register a backend. The first registered backend becomes the default.
    pub fn register<B: ClassifierBackend + 'static>(&mut self, backend: B) {
        let name = backend.name().to_string();
        if self.default_name.is_none() {
            self.default_name = Some(name.clone());
        }
        self.backends.insert(name, Arc::new(backend));
    }

    /// Set default backend by name.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.backends.contains_key(name) {
            return Err(anyhow!("backend '{}' not registered", name));
        }
        self.default_name = Some(name.to_string());
        Ok(())
    }

    /// Get backend by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn ClassifierBackend>> {
        self.backends.get(name).cloned()
    }

    /// Get default backend.
    pub fn default_backend(&self) -> Option<Arc<dyn ClassifierBackend>> {
        self.default_name.as_ref().and_then(|name| self.get(name))
    }

    /// Registered backend names, sorted.
    pub fn list(&self) -> Vec<String> {
        self.backends.keys().cloned().collect()
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_registered_is_default_until_overridden() {
        let mut registry = BackendRegistry::new();
        assert!(registry.default_backend().is_none());

        registry.register(SimulatedBackend::new());
        registry.register(MockBackend::new());
        assert_eq!(registry.default_backend().unwrap().name(), "simulated");

        registry.set_default("mock").unwrap();
        assert_eq!(registry.default_backend().unwrap().name(), "mock");
        assert!(registry.set_default("coreml").is_err());
        assert_eq!(registry.list(), vec!["mock", "simulated"]);
    }

    #[test]
    fn from_config_selects_configured_backend() {
        let mut config = DetectorConfig::default();
        config.backend.name = "mock".to_string();
        let registry = BackendRegistry::from_config(&config).unwrap();
        assert_eq!(registry.default_backend().unwrap().name(), "mock");
        assert!(registry.get("simulated").is_some());
    }
}

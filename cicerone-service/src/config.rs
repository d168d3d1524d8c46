//! Service configuration.
//!
//! Static settings (binding, storage, API credentials) are read once at
//! startup. Dynamic settings are held behind an `ArcSwap` and can be replaced
//! at runtime through the settings API.

mod dynamic_config;
mod loader;
mod static_config;

use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{ServiceError, ServiceResult};

pub use dynamic_config::{DynamicConfig, EmbeddingsConfig, FallbackConfig};
pub use loader::{load_dynamic_config, load_static_config};
pub use static_config::{GeminiConfig, StaticConfig};

/// Runtime configuration manager
/// Combines static config (startup-only) with dynamic config (hot-reloadable via ArcSwap)
pub struct RuntimeConfig {
    /// Static configuration (never changes after startup)
    pub static_config: StaticConfig,

    /// Config as loaded from file and environment, before overrides
    base: DynamicConfig,

    /// Dynamic configuration (can be hot-reloaded)
    dynamic: ArcSwap<DynamicConfig>,

    /// Settings overridden through the API, in memory only
    overrides: RwLock<HashMap<String, serde_json::Value>>,
}

impl RuntimeConfig {
    /// Build from already-loaded layers
    pub fn new(static_config: StaticConfig, dynamic: DynamicConfig) -> Self {
        Self {
            static_config,
            base: dynamic.clone(),
            dynamic: ArcSwap::from_pointee(dynamic),
            overrides: RwLock::new(HashMap::new()),
        }
    }

    /// Load config from all sources
    pub fn load() -> ServiceResult<Self> {
        let static_config = load_static_config()?;
        let dynamic = load_dynamic_config()?;
        Ok(Self::new(static_config, dynamic))
    }

    /// Get current dynamic config snapshot (lock-free read)
    pub fn dynamic(&self) -> arc_swap::Guard<Arc<DynamicConfig>> {
        self.dynamic.load()
    }

    /// Owned snapshot, for holding across await points
    pub fn snapshot(&self) -> Arc<DynamicConfig> {
        self.dynamic.load_full()
    }

    /// Update dynamic config (atomic swap)
    pub fn update_dynamic(&self, new_config: DynamicConfig) {
        self.dynamic.store(Arc::new(new_config));
    }

    /// Keys currently overridden through the settings API
    pub fn overridden_keys(&self) -> Vec<String> {
        let overrides = self.overrides.read().unwrap_or_else(|e| e.into_inner());
        let mut keys: Vec<String> = overrides.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Apply setting updates and hot-swap the dynamic config.
    ///
    /// A `null` value removes the override and reverts the key to its file/env value
    /// (except for `generation.temperature`, where `null` means "provider default").
    pub fn apply_settings(&self, updates: HashMap<String, serde_json::Value>) -> ServiceResult<()> {
        let valid_keys = DynamicConfig::valid_keys();
        if let Some(key) = updates.keys().find(|k| !valid_keys.contains(k.as_str())) {
            return Err(ServiceError::InvalidRequest {
                message: format!("Unknown setting key: {}", key),
            });
        }

        let mut overrides = self.overrides.write().unwrap_or_else(|e| e.into_inner());
        let mut next = overrides.clone();
        for (key, value) in updates {
            if value.is_null() && key != "generation.temperature" {
                next.remove(&key);
            } else {
                next.insert(key, value);
            }
        }

        let mut config = self.base.clone();
        config.merge_overrides(&next);
        config.validate()?;

        *overrides = next;
        self.update_dynamic(config);
        tracing::info!(overrides = overrides.len(), "Dynamic configuration reloaded");

        Ok(())
    }
}

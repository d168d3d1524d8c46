//! Dynamic configuration that can be updated at runtime via API.
//! Overrides applied through the settings API take precedence over config file/env values.

mod defaults;
mod keys;
mod merging;
mod schemas;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{ServiceError, ServiceResult};

pub use schemas::{AssistantConfig, EmbeddingsConfig, FallbackConfig, GenerationConfig};

use defaults::{default_assistant, default_embeddings, default_fallback, default_generation};

/// Dynamic configuration that can be updated at runtime via API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicConfig {
    #[serde(default = "default_generation")]
    pub generation: GenerationConfig,

    #[serde(default = "default_embeddings")]
    pub embeddings: EmbeddingsConfig,

    #[serde(default = "default_assistant")]
    pub assistant: AssistantConfig,

    #[serde(default = "default_fallback")]
    pub fallback: FallbackConfig,
}

impl Default for DynamicConfig {
    fn default() -> Self {
        Self {
            generation: default_generation(),
            embeddings: default_embeddings(),
            assistant: default_assistant(),
            fallback: default_fallback(),
        }
    }
}

impl DynamicConfig {
    /// Get all valid setting keys
    pub fn valid_keys() -> HashSet<&'static str> {
        keys::valid_keys()
    }

    /// Reject combinations the splitter and embedder cannot work with
    pub fn validate(&self) -> ServiceResult<()> {
        let embeddings = &self.embeddings;

        if embeddings.chunk_size == 0 {
            return Err(ServiceError::InvalidRequest {
                message: "embeddings.chunk_size must be greater than zero".to_string(),
            });
        }
        if embeddings.chunk_overlap >= embeddings.chunk_size {
            return Err(ServiceError::InvalidRequest {
                message: format!(
                    "embeddings.chunk_overlap ({}) must be smaller than embeddings.chunk_size ({})",
                    embeddings.chunk_overlap, embeddings.chunk_size
                ),
            });
        }
        if embeddings.batch_size == 0 || embeddings.batch_size > 100 {
            return Err(ServiceError::InvalidRequest {
                message: "embeddings.batch_size must be between 1 and 100".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = DynamicConfig::default();
        assert_eq!(config.embeddings.chunk_size, 1000);
        assert_eq!(config.embeddings.chunk_overlap, 200);
        assert_eq!(config.embeddings.top_k, 3);
        assert_eq!(config.fallback.max_chars, 1000);
        assert_eq!(config.assistant.topic, "Mangalore");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_every_key_round_trips_through_map() {
        let config = DynamicConfig::default();
        let map = config.to_key_value_map();
        let valid = DynamicConfig::valid_keys();

        assert_eq!(map.len(), valid.len());
        for key in map.keys() {
            assert!(valid.contains(key.as_str()), "unexpected key {}", key);
        }
    }

    #[test]
    fn test_merge_overrides() {
        let mut config = DynamicConfig::default();
        let mut overrides = HashMap::new();
        overrides.insert("assistant.topic".to_string(), serde_json::json!("Udupi"));
        overrides.insert("embeddings.top_k".to_string(), serde_json::json!(5));
        overrides.insert("generation.temperature".to_string(), serde_json::json!(0.5));
        // Wrong type is ignored
        overrides.insert("fallback.enabled".to_string(), serde_json::json!("yes"));

        config.merge_overrides(&overrides);

        assert_eq!(config.assistant.topic, "Udupi");
        assert_eq!(config.embeddings.top_k, 5);
        assert_eq!(config.generation.temperature, Some(0.5));
        assert!(config.fallback.enabled);

        overrides.clear();
        overrides.insert("generation.temperature".to_string(), serde_json::Value::Null);
        config.merge_overrides(&overrides);
        assert_eq!(config.generation.temperature, None);
    }

    #[test]
    fn test_validate_rejects_overlap_not_smaller_than_chunk() {
        let mut config = DynamicConfig::default();
        config.embeddings.chunk_overlap = config.embeddings.chunk_size;
        assert!(config.validate().is_err());

        config.embeddings.chunk_overlap = 0;
        config.embeddings.batch_size = 101;
        assert!(config.validate().is_err());
    }
}

//! Key-value conversion and override merging logic for DynamicConfig.

use std::collections::HashMap;

use super::DynamicConfig;

impl DynamicConfig {
    /// Convert config to key-value map for API response
    pub fn to_key_value_map(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();

        // Generation settings
        map.insert(
            "generation.model".to_string(),
            serde_json::Value::String(self.generation.model.clone()),
        );
        map.insert(
            "generation.temperature".to_string(),
            match self.generation.temperature {
                Some(t) => serde_json::json!(t),
                None => serde_json::Value::Null,
            },
        );

        // Embeddings settings
        map.insert(
            "embeddings.model".to_string(),
            serde_json::Value::String(self.embeddings.model.clone()),
        );
        map.insert(
            "embeddings.chunk_size".to_string(),
            serde_json::json!(self.embeddings.chunk_size),
        );
        map.insert(
            "embeddings.chunk_overlap".to_string(),
            serde_json::json!(self.embeddings.chunk_overlap),
        );
        map.insert(
            "embeddings.separator".to_string(),
            serde_json::Value::String(self.embeddings.separator.clone()),
        );
        map.insert(
            "embeddings.top_k".to_string(),
            serde_json::json!(self.embeddings.top_k),
        );
        map.insert(
            "embeddings.batch_size".to_string(),
            serde_json::json!(self.embeddings.batch_size),
        );

        // Assistant settings
        map.insert(
            "assistant.topic".to_string(),
            serde_json::Value::String(self.assistant.topic.clone()),
        );
        map.insert(
            "assistant.greeting".to_string(),
            serde_json::Value::String(self.assistant.greeting.clone()),
        );

        // Fallback settings
        map.insert(
            "fallback.enabled".to_string(),
            serde_json::json!(self.fallback.enabled),
        );
        map.insert(
            "fallback.search_url".to_string(),
            serde_json::Value::String(self.fallback.search_url.clone()),
        );
        map.insert(
            "fallback.wikipedia_url".to_string(),
            serde_json::Value::String(self.fallback.wikipedia_url.clone()),
        );
        map.insert(
            "fallback.user_agent".to_string(),
            serde_json::Value::String(self.fallback.user_agent.clone()),
        );
        map.insert(
            "fallback.max_chars".to_string(),
            serde_json::json!(self.fallback.max_chars),
        );
        map.insert(
            "fallback.timeout_secs".to_string(),
            serde_json::json!(self.fallback.timeout_secs),
        );
        map.insert(
            "fallback.result_selector".to_string(),
            serde_json::Value::String(self.fallback.result_selector.clone()),
        );
        map.insert(
            "fallback.title_selector".to_string(),
            serde_json::Value::String(self.fallback.title_selector.clone()),
        );
        map.insert(
            "fallback.snippet_selector".to_string(),
            serde_json::Value::String(self.fallback.snippet_selector.clone()),
        );

        map
    }

    /// Apply setting overrides to this config
    pub fn merge_overrides(&mut self, overrides: &HashMap<String, serde_json::Value>) {
        for (key, value) in overrides {
            self.apply_setting(key, value);
        }
    }

    /// Apply a single setting value. Values of the wrong type are ignored.
    fn apply_setting(&mut self, key: &str, value: &serde_json::Value) {
        let applied = match key {
            // Generation settings
            "generation.model" => value
                .as_str()
                .map(|v| self.generation.model = v.to_string())
                .is_some(),
            "generation.temperature" => {
                if value.is_null() {
                    self.generation.temperature = None;
                    true
                } else {
                    value
                        .as_f64()
                        .map(|v| self.generation.temperature = Some(v as f32))
                        .is_some()
                }
            }

            // Embeddings settings
            "embeddings.model" => value
                .as_str()
                .map(|v| self.embeddings.model = v.to_string())
                .is_some(),
            "embeddings.chunk_size" => value
                .as_u64()
                .map(|v| self.embeddings.chunk_size = v as usize)
                .is_some(),
            "embeddings.chunk_overlap" => value
                .as_u64()
                .map(|v| self.embeddings.chunk_overlap = v as usize)
                .is_some(),
            "embeddings.separator" => value
                .as_str()
                .map(|v| self.embeddings.separator = v.to_string())
                .is_some(),
            "embeddings.top_k" => value
                .as_u64()
                .map(|v| self.embeddings.top_k = v as usize)
                .is_some(),
            "embeddings.batch_size" => value
                .as_u64()
                .map(|v| self.embeddings.batch_size = v as usize)
                .is_some(),

            // Assistant settings
            "assistant.topic" => value
                .as_str()
                .map(|v| self.assistant.topic = v.to_string())
                .is_some(),
            "assistant.greeting" => value
                .as_str()
                .map(|v| self.assistant.greeting = v.to_string())
                .is_some(),

            // Fallback settings
            "fallback.enabled" => value
                .as_bool()
                .map(|v| self.fallback.enabled = v)
                .is_some(),
            "fallback.search_url" => value
                .as_str()
                .map(|v| self.fallback.search_url = v.to_string())
                .is_some(),
            "fallback.wikipedia_url" => value
                .as_str()
                .map(|v| self.fallback.wikipedia_url = v.to_string())
                .is_some(),
            "fallback.user_agent" => value
                .as_str()
                .map(|v| self.fallback.user_agent = v.to_string())
                .is_some(),
            "fallback.max_chars" => value
                .as_u64()
                .map(|v| self.fallback.max_chars = v as usize)
                .is_some(),
            "fallback.timeout_secs" => value
                .as_u64()
                .map(|v| self.fallback.timeout_secs = v)
                .is_some(),
            "fallback.result_selector" => value
                .as_str()
                .map(|v| self.fallback.result_selector = v.to_string())
                .is_some(),
            "fallback.title_selector" => value
                .as_str()
                .map(|v| self.fallback.title_selector = v.to_string())
                .is_some(),
            "fallback.snippet_selector" => value
                .as_str()
                .map(|v| self.fallback.snippet_selector = v.to_string())
                .is_some(),

            _ => {
                tracing::warn!(key = %key, "Unknown setting key in merge_overrides");
                return;
            }
        };

        if !applied {
            tracing::warn!(key = %key, value = %value, "Ignoring setting value of the wrong type");
        }
    }
}

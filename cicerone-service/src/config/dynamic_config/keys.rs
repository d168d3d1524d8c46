//! Valid setting keys for DynamicConfig.

use std::collections::HashSet;

/// All valid setting keys for DynamicConfig
pub const VALID_SETTING_KEYS: &[&str] = &[
    "generation.model",
    "generation.temperature",
    "embeddings.model",
    "embeddings.chunk_size",
    "embeddings.chunk_overlap",
    "embeddings.separator",
    "embeddings.top_k",
    "embeddings.batch_size",
    "assistant.topic",
    "assistant.greeting",
    "fallback.enabled",
    "fallback.search_url",
    "fallback.wikipedia_url",
    "fallback.user_agent",
    "fallback.max_chars",
    "fallback.timeout_secs",
    "fallback.result_selector",
    "fallback.title_selector",
    "fallback.snippet_selector",
];

/// Get all valid setting keys as a HashSet
pub fn valid_keys() -> HashSet<&'static str> {
    VALID_SETTING_KEYS.iter().copied().collect()
}

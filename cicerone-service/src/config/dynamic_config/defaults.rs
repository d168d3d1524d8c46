//! Default value functions for DynamicConfig.

use super::schemas::{AssistantConfig, EmbeddingsConfig, FallbackConfig, GenerationConfig};

// ==================== Top-level Section Defaults ====================

pub(crate) fn default_generation() -> GenerationConfig {
    GenerationConfig {
        model: default_model(),
        temperature: None,
    }
}

pub(crate) fn default_embeddings() -> EmbeddingsConfig {
    EmbeddingsConfig {
        model: default_embedding_model(),
        chunk_size: default_chunk_size(),
        chunk_overlap: default_chunk_overlap(),
        separator: default_separator(),
        top_k: default_top_k(),
        batch_size: default_batch_size(),
    }
}

pub(crate) fn default_assistant() -> AssistantConfig {
    AssistantConfig {
        topic: default_topic(),
        greeting: default_greeting(),
    }
}

pub(crate) fn default_fallback() -> FallbackConfig {
    FallbackConfig {
        enabled: default_fallback_enabled(),
        search_url: default_search_url(),
        wikipedia_url: default_wikipedia_url(),
        user_agent: default_user_agent(),
        max_chars: default_max_chars(),
        timeout_secs: default_fallback_timeout_secs(),
        result_selector: default_result_selector(),
        title_selector: default_title_selector(),
        snippet_selector: default_snippet_selector(),
    }
}

// ==================== Generation Defaults ====================

pub(crate) fn default_model() -> String {
    "gemini-pro".to_string()
}

// ==================== Embeddings Defaults ====================

pub(crate) fn default_embedding_model() -> String {
    "embedding-001".to_string()
}

pub(crate) fn default_chunk_size() -> usize {
    1000
}

pub(crate) fn default_chunk_overlap() -> usize {
    200
}

pub(crate) fn default_separator() -> String {
    "\n\n".to_string()
}

pub(crate) fn default_top_k() -> usize {
    3
}

pub(crate) fn default_batch_size() -> usize {
    100
}

// ==================== Assistant Defaults ====================

pub(crate) fn default_topic() -> String {
    "Mangalore".to_string()
}

pub(crate) fn default_greeting() -> String {
    "Hello! How can I assist you today?".to_string()
}

// ==================== Fallback Defaults ====================

pub(crate) fn default_fallback_enabled() -> bool {
    true
}

pub(crate) fn default_search_url() -> String {
    "https://www.google.com/search".to_string()
}

pub(crate) fn default_wikipedia_url() -> String {
    "https://en.wikipedia.org".to_string()
}

pub(crate) fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string()
}

pub(crate) fn default_max_chars() -> usize {
    1000
}

pub(crate) fn default_fallback_timeout_secs() -> u64 {
    15
}

pub(crate) fn default_result_selector() -> String {
    ".g".to_string()
}

pub(crate) fn default_title_selector() -> String {
    "h3".to_string()
}

pub(crate) fn default_snippet_selector() -> String {
    ".VwiC3b".to_string()
}

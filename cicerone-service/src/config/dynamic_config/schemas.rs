//! Configuration struct definitions for DynamicConfig sections.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Answer generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "super::defaults::default_model")]
    pub model: String,

    /// Sampling temperature. `None` leaves the provider default in place.
    #[serde(default)]
    pub temperature: Option<f32>,
}

/// Embeddings and retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    #[serde(default = "super::defaults::default_embedding_model")]
    pub model: String,

    /// Maximum chunk length in characters
    #[serde(default = "super::defaults::default_chunk_size")]
    pub chunk_size: usize,

    /// Characters carried over between neighbouring chunks
    #[serde(default = "super::defaults::default_chunk_overlap")]
    pub chunk_overlap: usize,

    #[serde(default = "super::defaults::default_separator")]
    pub separator: String,

    /// Number of chunks retrieved per question
    #[serde(default = "super::defaults::default_top_k")]
    pub top_k: usize,

    /// Chunks per batch embedding request (provider limit is 100)
    #[serde(default = "super::defaults::default_batch_size")]
    pub batch_size: usize,
}

/// Assistant persona
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Subject the assistant specializes in; also the fallback lookup topic
    #[serde(default = "super::defaults::default_topic")]
    pub topic: String,

    #[serde(default = "super::defaults::default_greeting")]
    pub greeting: String,
}

/// Web search and encyclopedia fallback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    #[serde(default = "super::defaults::default_fallback_enabled")]
    pub enabled: bool,

    #[serde(default = "super::defaults::default_search_url")]
    pub search_url: String,

    #[serde(default = "super::defaults::default_wikipedia_url")]
    pub wikipedia_url: String,

    #[serde(default = "super::defaults::default_user_agent")]
    pub user_agent: String,

    /// Web search text is cut to this many characters
    #[serde(default = "super::defaults::default_max_chars")]
    pub max_chars: usize,

    #[serde(default = "super::defaults::default_fallback_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "super::defaults::default_result_selector")]
    pub result_selector: String,

    #[serde(default = "super::defaults::default_title_selector")]
    pub title_selector: String,

    #[serde(default = "super::defaults::default_snippet_selector")]
    pub snippet_selector: String,
}

impl FallbackConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

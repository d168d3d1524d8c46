//! Static configuration that cannot be changed at runtime.
//! These settings affect server binding or require restart to change.

use serde::Deserialize;
use std::path::PathBuf;

/// Environment variable consulted when `gemini.api_key` is not configured.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Static configuration that cannot be changed at runtime
#[derive(Debug, Clone, Deserialize)]
pub struct StaticConfig {
    #[serde(default = "default_server")]
    pub server: ServerConfig,

    #[serde(default = "default_storage")]
    pub storage: StorageConfig,

    #[serde(default = "default_gemini")]
    pub gemini: GeminiConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// The single document indexed at startup
    #[serde(default = "default_document_path")]
    pub document_path: PathBuf,

    /// Directory for the cached index snapshot
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// Gemini API connection settings
#[derive(Clone, Deserialize)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_gemini_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl GeminiConfig {
    /// Configured key, or the `GEMINI_API_KEY` environment variable when unset.
    pub fn resolve_api_key(&self) -> Option<String> {
        if !self.api_key.trim().is_empty() {
            return Some(self.api_key.trim().to_string());
        }
        std::env::var(GEMINI_API_KEY_ENV)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }
}

// Keep the key out of logs.
impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &if self.api_key.is_empty() { "" } else { "***" })
            .field("base_url", &self.base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

// ==================== Default Value Functions ====================

pub(crate) fn default_server() -> ServerConfig {
    ServerConfig {
        host: default_host(),
        port: default_port(),
    }
}

pub(crate) fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub(crate) fn default_port() -> u16 {
    8080
}

pub(crate) fn default_storage() -> StorageConfig {
    StorageConfig {
        document_path: default_document_path(),
        data_dir: default_data_dir(),
    }
}

pub(crate) fn default_document_path() -> PathBuf {
    PathBuf::from("public/gg.pdf")
}

pub(crate) fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

pub(crate) fn default_gemini() -> GeminiConfig {
    GeminiConfig {
        api_key: String::new(),
        base_url: default_gemini_url(),
        request_timeout_secs: default_request_timeout_secs(),
    }
}

pub(crate) fn default_gemini_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

pub(crate) fn default_request_timeout_secs() -> u64 {
    120
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_api_key_wins() {
        let config = GeminiConfig {
            api_key: "  configured-key ".to_string(),
            ..default_gemini()
        };
        assert_eq!(config.resolve_api_key().as_deref(), Some("configured-key"));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = GeminiConfig {
            api_key: "secret".to_string(),
            ..default_gemini()
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("***"));
    }
}

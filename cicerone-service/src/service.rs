mod chat;
mod context;
mod prompts;

pub use chat::ChatMessage;
pub use context::ResolvedContext;

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::RuntimeConfig;
use crate::error::ServiceResult;
use crate::gemini::GeminiClient;
use crate::i18n::I18n;
use crate::search::SearchService;
use crate::web::WebLookup;

/// Main service coordinator
pub struct CiceroneService {
    pub runtime_config: Arc<RuntimeConfig>,
    pub gemini: Arc<GeminiClient>,
    pub search: Arc<SearchService>,
    pub web: Arc<WebLookup>,
    pub i18n: Arc<I18n>,
}

impl CiceroneService {
    /// Create a new service instance
    pub async fn new(runtime_config: Arc<RuntimeConfig>) -> ServiceResult<Self> {
        info!("Initializing Cicerone service");

        let gemini = Arc::new(GeminiClient::new(&runtime_config.static_config.gemini)?);

        if gemini.health_check().await? {
            info!(url = %runtime_config.static_config.gemini.base_url, "Gemini API is available");
        } else {
            warn!(url = %runtime_config.static_config.gemini.base_url, "Gemini API is not available");
        }

        let search = Arc::new(SearchService::new(gemini.clone()));

        Ok(Self {
            runtime_config,
            gemini,
            search,
            web: Arc::new(WebLookup::new()),
            i18n: Arc::new(I18n::new()),
        })
    }

    /// Index the configured document. Runs until the index is ready or has failed.
    pub async fn build_index(&self) {
        let storage = &self.runtime_config.static_config.storage;
        let embeddings = self.runtime_config.snapshot().embeddings.clone();

        self.search
            .build_index(&storage.document_path, &storage.data_dir, &embeddings)
            .await;
    }
}

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use strum::Display;
use tracing::{debug, error, info, warn};

use crate::config::EmbeddingsConfig;
use crate::error::{EmbeddingError, ServiceError, ServiceResult, format_error_chain};
use crate::gemini::{GeminiClient, TaskType};
use crate::index::{IndexFingerprint, IndexSnapshot, IndexedChunk, VectorIndex, document_hash};
use crate::ingestion::{Chunk, IngestionService};

/// Lifecycle of the document index
pub enum IndexState {
    Building {
        document: PathBuf,
    },
    Ready {
        index: VectorIndex,
        document: PathBuf,
        embedding_model: String,
        built_at: DateTime<Utc>,
    },
    Failed {
        document: PathBuf,
        message: String,
    },
    Missing,
}

/// Coarse phase of the index, as reported over the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IndexPhase {
    Building,
    Ready,
    Failed,
    Missing,
}

/// Serializable view of [`IndexState`]
#[derive(Debug, Clone, Serialize)]
pub struct IndexStatus {
    pub phase: IndexPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub built_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Search service for RAG functionality using Gemini embeddings
pub struct SearchService {
    gemini: Arc<GeminiClient>,
    state: ArcSwap<IndexState>,
}

impl SearchService {
    pub fn new(gemini: Arc<GeminiClient>) -> Self {
        Self {
            gemini,
            state: ArcSwap::from_pointee(IndexState::Missing),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(**self.state.load(), IndexState::Ready { .. })
    }

    /// Build (or restore) the index for `document_path`.
    ///
    /// Never returns an error: failures are logged and recorded as
    /// [`IndexState::Failed`] so questions keep being answered from fallback
    /// context.
    pub async fn build_index(
        &self,
        document_path: &Path,
        data_dir: &Path,
        config: &EmbeddingsConfig,
    ) {
        if !document_path.is_file() {
            warn!(
                path = %document_path.display(),
                "Document not found, answering from fallback context only"
            );
            self.state.store(Arc::new(IndexState::Missing));
            metrics::gauge!("cicerone_index_chunks").set(0.0);
            return;
        }

        self.state.store(Arc::new(IndexState::Building {
            document: document_path.to_path_buf(),
        }));

        match self.load_or_build(document_path, data_dir, config).await {
            Ok((index, built_at)) => {
                info!(
                    path = %document_path.display(),
                    chunks = index.len(),
                    dimension = ?index.dimension(),
                    "Document index ready"
                );
                metrics::gauge!("cicerone_index_chunks").set(index.len() as f64);
                self.state.store(Arc::new(IndexState::Ready {
                    index,
                    document: document_path.to_path_buf(),
                    embedding_model: config.model.clone(),
                    built_at,
                }));
            }
            Err(e) => {
                error!(
                    path = %document_path.display(),
                    error = %format_error_chain(&e),
                    "Failed to build document index"
                );
                metrics::gauge!("cicerone_index_chunks").set(0.0);
                self.state.store(Arc::new(IndexState::Failed {
                    document: document_path.to_path_buf(),
                    message: e.to_string(),
                }));
            }
        }
    }

    async fn load_or_build(
        &self,
        document_path: &Path,
        data_dir: &Path,
        config: &EmbeddingsConfig,
    ) -> ServiceResult<(VectorIndex, DateTime<Utc>)> {
        let path = document_path.to_path_buf();
        let dir = data_dir.to_path_buf();
        let settings = config.clone();
        let (fingerprint, restored) = run_blocking("Index snapshot lookup", move || {
            let fingerprint = IndexFingerprint {
                document_hash: document_hash(&path)?,
                embedding_model: settings.model.clone(),
                chunk_size: settings.chunk_size,
                chunk_overlap: settings.chunk_overlap,
                separator: settings.separator.clone(),
            };
            let restored = match IndexSnapshot::load_matching(&dir, &fingerprint)? {
                Some(snapshot) => {
                    info!(chunks = snapshot.chunks.len(), "Restored index from snapshot");
                    let built_at = snapshot.built_at;
                    Some((snapshot.into_index()?, built_at))
                }
                None => None,
            };
            Ok((fingerprint, restored))
        })
        .await?;

        if let Some(restored) = restored {
            return Ok(restored);
        }

        let path = document_path.to_path_buf();
        let ingestion = IngestionService::new(config);
        let chunks =
            run_blocking("Document loading", move || ingestion.load_document(&path)).await?;

        let entries = self.embed_chunks(chunks, config).await?;
        let snapshot = IndexSnapshot {
            fingerprint,
            built_at: Utc::now(),
            chunks: entries,
        };
        let built_at = snapshot.built_at;

        let dir = data_dir.to_path_buf();
        let (index, saved) = run_blocking("Index snapshot write", move || {
            let saved = snapshot.save(&dir);
            Ok((snapshot.into_index()?, saved))
        })
        .await?;

        match saved {
            Ok(path) => debug!(path = %path.display(), "Index snapshot written"),
            Err(e) => warn!(
                error = %format_error_chain(&e),
                "Failed to write index snapshot"
            ),
        }

        Ok((index, built_at))
    }

    /// Embed chunks in provider-sized batches, logging progress
    async fn embed_chunks(
        &self,
        chunks: Vec<Chunk>,
        config: &EmbeddingsConfig,
    ) -> ServiceResult<Vec<IndexedChunk>> {
        let total = chunks.len();
        info!(total = total, model = %config.model, "Starting embedding generation");

        let mut entries = Vec::with_capacity(total);
        for batch in chunks.chunks(config.batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let embeddings = self
                .gemini
                .embed_batch(&config.model, &texts, TaskType::RetrievalDocument)
                .await?;

            for (chunk, embedding) in batch.iter().zip(embeddings) {
                entries.push(IndexedChunk {
                    chunk: chunk.clone(),
                    embedding,
                });
            }

            let progress = entries.len();
            info!(
                progress = progress,
                total = total,
                percent = (progress * 100) / total.max(1),
                "Generating embeddings"
            );
        }

        Ok(entries)
    }

    /// Search for the chunks most relevant to `query`.
    ///
    /// The query is embedded with the model that built the index. Returns
    /// nothing while the index is not ready.
    pub async fn search(&self, query: &str, limit: usize) -> ServiceResult<Vec<SearchResult>> {
        let state = self.state.load_full();
        let IndexState::Ready {
            index,
            embedding_model,
            ..
        } = state.as_ref()
        else {
            debug!("Index not ready, skipping document search");
            return Ok(Vec::new());
        };

        if limit == 0 || index.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self
            .gemini
            .embed(embedding_model, query, TaskType::RetrievalQuery)
            .await?;
        if let Some(expected) = index.dimension()
            && expected != query_embedding.len()
        {
            return Err(ServiceError::Embedding(EmbeddingError::DimensionMismatch {
                expected,
                actual: query_embedding.len(),
            }));
        }

        let results: Vec<SearchResult> = index
            .similarity_search(&query_embedding, limit)
            .into_iter()
            .map(|(chunk, similarity)| SearchResult {
                chunk: chunk.clone(),
                similarity,
            })
            .collect();

        debug!(results = results.len(), "Search completed");
        Ok(results)
    }

    pub fn status(&self) -> IndexStatus {
        let state = self.state.load();
        let mut status = IndexStatus {
            phase: IndexPhase::Missing,
            document: None,
            chunks: None,
            dimension: None,
            embedding_model: None,
            built_at: None,
            error: None,
        };

        match state.as_ref() {
            IndexState::Building { document } => {
                status.phase = IndexPhase::Building;
                status.document = Some(document.display().to_string());
            }
            IndexState::Ready {
                index,
                document,
                embedding_model,
                built_at,
            } => {
                status.phase = IndexPhase::Ready;
                status.document = Some(document.display().to_string());
                status.chunks = Some(index.len());
                status.dimension = index.dimension();
                status.embedding_model = Some(embedding_model.clone());
                status.built_at = Some(*built_at);
            }
            IndexState::Failed { document, message } => {
                status.phase = IndexPhase::Failed;
                status.document = Some(document.display().to_string());
                status.error = Some(message.clone());
            }
            IndexState::Missing => {}
        }

        status
    }
}

/// Run file IO and (de)serialization off the async runtime
async fn run_blocking<T, F>(task: &'static str, f: F) -> ServiceResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> ServiceResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ServiceError::Internal {
            message: format!("{} task failed: {}", task, e),
        })?
}

/// Search result
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub chunk: Chunk,
    pub similarity: f32,
}

/// Join result contents into a single context block
pub fn join_results(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| r.chunk.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

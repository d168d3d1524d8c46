//! Picks the context handed to the model: document chunks when the index has
//! them, otherwise web search results and the encyclopedia summary.

use std::time::Instant;
use strum::Display;
use tracing::{debug, warn};

use crate::config::DynamicConfig;
use crate::error::format_error_chain;
use crate::i18n::Message;
use crate::search::join_results;

use super::CiceroneService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ContextSource {
    Document,
    Web,
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedContext {
    pub text: String,
    pub source: ContextSource,
}

impl CiceroneService {
    pub async fn resolve_context(
        &self,
        config: &DynamicConfig,
        question: &str,
    ) -> ResolvedContext {
        let started = Instant::now();
        let document_context = match self.search.search(question, config.embeddings.top_k).await {
            Ok(results) => join_results(&results),
            Err(e) => {
                warn!(
                    error = %format_error_chain(&e),
                    "Document retrieval failed, using fallback"
                );
                String::new()
            }
        };
        metrics::histogram!("cicerone_retrieval_seconds")
            .record(started.elapsed().as_secs_f64());

        let resolved = if !document_context.is_empty() {
            ResolvedContext {
                text: document_context,
                source: ContextSource::Document,
            }
        } else if config.fallback.enabled {
            self.fallback_context(config, question).await
        } else {
            ResolvedContext {
                text: String::new(),
                source: ContextSource::None,
            }
        };

        debug!(
            source = %resolved.source,
            length = resolved.text.len(),
            "Context resolved"
        );
        metrics::counter!(
            "cicerone_context_source_total",
            "source" => resolved.source.to_string()
        )
        .increment(1);

        resolved
    }

    async fn fallback_context(&self, config: &DynamicConfig, question: &str) -> ResolvedContext {
        let topic = &config.assistant.topic;
        let query = format!("{} {}", topic, question);

        let (web, wiki) = tokio::join!(
            self.web.web_search(&config.fallback, &query),
            self.web.wikipedia_summary(&config.fallback, topic),
        );

        let text = format!(
            "{}:\n{}\n\n{}:\n{}",
            self.i18n.text(Message::ContextWebResults),
            web,
            self.i18n.text(Message::ContextWikiSummary),
            wiki
        );

        ResolvedContext {
            text,
            source: ContextSource::Web,
        }
    }
}

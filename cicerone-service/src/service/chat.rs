//! Chat orchestration: transcript validation, context, prompt, model stream.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::error::{ServiceError, ServiceResult, format_error_chain};
use crate::gemini::{ChatRequest, Content, StreamEvent};
use crate::i18n::Message;

use super::CiceroneService;

/// One message of the browser transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Map every message but the last into model turns. `user` stays `user`,
/// any other role becomes `model`. Messages without text are skipped.
pub fn history_from_transcript(messages: &[ChatMessage]) -> Vec<Content> {
    let Some((_, earlier)) = messages.split_last() else {
        return Vec::new();
    };

    earlier
        .iter()
        .filter(|m| !m.content.trim().is_empty())
        .map(|m| {
            if m.role == "user" {
                Content::user(m.content.clone())
            } else {
                Content::model(m.content.clone())
            }
        })
        .collect()
}

impl CiceroneService {
    /// Answer the last message of `messages`, streaming the reply.
    pub async fn chat(
        &self,
        messages: Vec<ChatMessage>,
    ) -> ServiceResult<mpsc::Receiver<StreamEvent>> {
        metrics::counter!("cicerone_chat_requests_total").increment(1);

        let question = match messages.last() {
            Some(last) if !last.content.trim().is_empty() => last.content.clone(),
            _ => {
                return Err(ServiceError::InvalidRequest {
                    message: self.i18n.text(Message::ErrorInvalidTranscript),
                });
            }
        };

        let config = self.runtime_config.snapshot();
        info!(
            turns = messages.len(),
            question_length = question.len(),
            "Chat request"
        );

        let context = self.resolve_context(&config, &question).await;
        let prompt = self.build_prompt(&config, &context, &question);
        let history = history_from_transcript(&messages);

        debug!(
            model = %config.generation.model,
            history = history.len(),
            prompt_length = prompt.len(),
            context_source = %context.source,
            "Sending prompt to model"
        );

        self.gemini
            .chat_stream(ChatRequest {
                model: config.generation.model.clone(),
                history,
                prompt,
                temperature: config.generation.temperature,
            })
            .await
            .inspect_err(|e| {
                metrics::counter!("cicerone_chat_failures_total").increment(1);
                error!(error = %format_error_chain(e), "Failed to start model stream");
            })
    }
}

//! Streaming chat endpoint.

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::api::AppState;
use crate::error::ServiceError;
use crate::gemini::StreamEvent;
use crate::i18n::Message;
use crate::service::ChatMessage;

/// Request body for POST /api/chat
#[derive(Debug, Deserialize)]
pub struct ChatBody {
    pub messages: Vec<ChatMessage>,
}

/// POST /api/chat - answer the last message, streaming plain text
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatBody>,
) -> Response {
    let mut rx = match state.service.chat(body.messages).await {
        Ok(rx) => rx,
        Err(e @ ServiceError::InvalidRequest { .. }) => return e.into_response(),
        Err(_) => return internal_error(&state),
    };

    // Hold the response until the model has produced something, so failures
    // that happen before any text still get a proper status.
    let first = match rx.recv().await {
        Some(StreamEvent::Error(message)) => {
            metrics::counter!("cicerone_chat_failures_total").increment(1);
            error!(error = %message, "Model stream failed before any output");
            return internal_error(&state);
        }
        other => other,
    };

    let stream = async_stream::stream! {
        let mut next = first;
        while let Some(event) = next {
            match event {
                StreamEvent::Content(text) => {
                    yield Ok::<_, std::io::Error>(Bytes::from(text));
                }
                StreamEvent::Done { finish_reason, prompt_tokens, completion_tokens } => {
                    debug!(
                        finish_reason = ?finish_reason,
                        prompt_tokens = ?prompt_tokens,
                        completion_tokens = ?completion_tokens,
                        "Model stream finished"
                    );
                    break;
                }
                StreamEvent::Error(message) => {
                    metrics::counter!("cicerone_chat_failures_total").increment(1);
                    warn!(error = %message, "Model stream failed, ending response early");
                    break;
                }
            }
            next = rx.recv().await;
        }
    };

    (
        [(header::CONTENT_TYPE, mime::TEXT_PLAIN_UTF_8.as_ref())],
        Body::from_stream(stream),
    )
        .into_response()
}

fn internal_error(state: &AppState) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, mime::TEXT_PLAIN_UTF_8.as_ref())],
        state.service.i18n.text(Message::ErrorInternal),
    )
        .into_response()
}

//! Client for the hosted Gemini generative-language API.
//!
//! Covers the three calls the service needs: embedding document chunks and
//! questions, and streaming a chat completion back token by token.

mod sse;

use futures::StreamExt;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::GeminiConfig;
use crate::error::{GeminiError, ServiceError, ServiceResult};

use sse::SseDecoder;

const API_VERSION: &str = "v1beta";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini API client
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(config: &GeminiConfig) -> ServiceResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                ServiceError::Gemini(GeminiError::Connection {
                    url: config.base_url.clone(),
                    source: e,
                })
            })?;

        let api_key = config.resolve_api_key();
        if api_key.is_none() {
            warn!("No Gemini API key configured; embedding and chat requests will fail");
        }

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder, GeminiError> {
        let key = self.api_key.as_deref().ok_or(GeminiError::MissingApiKey)?;
        Ok(builder.header(API_KEY_HEADER, key))
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/{}/{}:{}",
            self.base_url,
            API_VERSION,
            qualified_model(model),
            method
        )
    }

    /// Check if the API is reachable with the configured key
    pub async fn health_check(&self) -> ServiceResult<bool> {
        let url = format!("{}/{}/models", self.base_url, API_VERSION);

        let request = match self.authorized(self.client.get(&url)) {
            Ok(r) => r,
            Err(_) => return Ok(false),
        };

        match request.send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(e) => {
                warn!(error = %e, "Gemini health check failed");
                Ok(false)
            }
        }
    }

    /// Embed a single text
    pub async fn embed(&self, model: &str, text: &str, task: TaskType) -> ServiceResult<Vec<f32>> {
        let url = self.model_url(model, "embedContent");
        let request = EmbedContentRequest::new(model, text, task);

        let response = self
            .send_json(self.authorized(self.client.post(&url))?.json(&request), &url)
            .await?;

        let body: EmbedContentResponse = read_json(response).await?;
        Ok(body.embedding.values)
    }

    /// Embed several texts in one request. Output order matches input order.
    pub async fn embed_batch(
        &self,
        model: &str,
        texts: &[String],
        task: TaskType,
    ) -> ServiceResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.model_url(model, "batchEmbedContents");
        let request = BatchEmbedContentsRequest {
            requests: texts
                .iter()
                .map(|text| EmbedContentRequest::new(model, text, task))
                .collect(),
        };

        let response = self
            .send_json(self.authorized(self.client.post(&url))?.json(&request), &url)
            .await?;

        let body: BatchEmbedContentsResponse = read_json(response).await?;
        if body.embeddings.len() != texts.len() {
            return Err(ServiceError::Gemini(GeminiError::Generation {
                status: 200,
                message: format!(
                    "Expected {} embeddings, received {}",
                    texts.len(),
                    body.embeddings.len()
                ),
            }));
        }

        Ok(body.embeddings.into_iter().map(|e| e.values).collect())
    }

    /// Start a streaming chat completion.
    ///
    /// Errors reported before the body starts are returned directly; anything
    /// after that arrives on the channel as [`StreamEvent::Error`]. Dropping the
    /// receiver stops the transfer.
    pub async fn chat_stream(
        &self,
        request: ChatRequest,
    ) -> ServiceResult<mpsc::Receiver<StreamEvent>> {
        let url = format!(
            "{}?alt=sse",
            self.model_url(&request.model, "streamGenerateContent")
        );

        let mut contents = request.history;
        contents.push(Content::user(request.prompt));

        let body = GenerateContentRequest {
            contents,
            generation_config: request.temperature.map(|t| GenerationConfig {
                temperature: Some(t),
            }),
        };

        debug!(
            model = %request.model,
            turns = body.contents.len(),
            "Starting Gemini stream"
        );

        let response = self
            .send_json(self.authorized(self.client.post(&url))?.json(&body), &url)
            .await?;

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(async move {
            let mut decoder = SseDecoder::new();
            let mut state = StreamState::default();
            let mut bytes = response.bytes_stream();

            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        let _ = tx.send(StreamEvent::Error(e.to_string())).await;
                        return;
                    }
                };

                for payload in decoder.push(&chunk) {
                    if !forward_payload(&mut state, &payload, &tx).await {
                        return;
                    }
                }
            }

            if let Some(payload) = decoder.finish()
                && !forward_payload(&mut state, &payload, &tx).await
            {
                return;
            }

            let _ = tx.send(state.into_done()).await;
        });

        Ok(rx)
    }

    async fn send_json(&self, request: RequestBuilder, url: &str) -> ServiceResult<Response> {
        let response = request.send().await.map_err(|e| GeminiError::Connection {
            url: redact_url(url),
            source: e,
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|body| body.error.message)
                .unwrap_or(text);

            return Err(ServiceError::Gemini(GeminiError::Generation {
                status,
                message,
            }));
        }

        Ok(response)
    }
}

/// Relay one decoded payload. Returns false when the stream should stop.
async fn forward_payload(
    state: &mut StreamState,
    payload: &str,
    tx: &mpsc::Sender<StreamEvent>,
) -> bool {
    match state.handle_payload(payload) {
        Ok(Some(text)) => tx.send(StreamEvent::Content(text)).await.is_ok(),
        Ok(None) => !tx.is_closed(),
        Err(message) => {
            let _ = tx.send(StreamEvent::Error(message)).await;
            false
        }
    }
}

async fn read_json<T: for<'de> Deserialize<'de>>(response: Response) -> ServiceResult<T> {
    let text = response.text().await.map_err(|e| GeminiError::Generation {
        status: 200,
        message: e.to_string(),
    })?;
    serde_json::from_str(&text)
        .map_err(|e| ServiceError::Gemini(GeminiError::InvalidResponse { source: e }))
}

/// `gemini-pro` and `models/gemini-pro` both name the same model
fn qualified_model(model: &str) -> String {
    if model.starts_with("models/") || model.starts_with("tunedModels/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    }
}

fn redact_url(url: &str) -> String {
    url.split('?').next().unwrap_or(url).to_string()
}

/// Accumulates per-stream metadata while decoding chunks
#[derive(Debug, Default)]
struct StreamState {
    finish_reason: Option<String>,
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
}

impl StreamState {
    /// Decode one SSE payload into the text it carries, if any.
    fn handle_payload(&mut self, payload: &str) -> Result<Option<String>, String> {
        let chunk: StreamChunk = serde_json::from_str(payload)
            .map_err(|e| format!("Invalid stream chunk from Gemini: {}", e))?;

        if let Some(error) = chunk.error {
            return Err(error.message);
        }

        if let Some(usage) = chunk.usage_metadata {
            self.prompt_tokens = usage.prompt_token_count.or(self.prompt_tokens);
            self.completion_tokens = usage.candidates_token_count.or(self.completion_tokens);
        }

        if chunk.candidates.is_empty() {
            if let Some(reason) = chunk.prompt_feedback.and_then(|f| f.block_reason) {
                return Err(GeminiError::Blocked { reason }.to_string());
            }
            return Ok(None);
        }

        let candidate = &chunk.candidates[0];
        if let Some(reason) = &candidate.finish_reason {
            if reason != "STOP" {
                warn!(finish_reason = %reason, "Gemini stopped early");
            }
            self.finish_reason = Some(reason.clone());
        }

        let text: String = candidate
            .content
            .as_ref()
            .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect())
            .unwrap_or_default();

        Ok(if text.is_empty() { None } else { Some(text) })
    }

    fn into_done(self) -> StreamEvent {
        StreamEvent::Done {
            finish_reason: self.finish_reason,
            prompt_tokens: self.prompt_tokens,
            completion_tokens: self.completion_tokens,
        }
    }
}

/// Events produced while streaming a completion
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Content(String),
    Done {
        finish_reason: Option<String>,
        prompt_tokens: Option<u32>,
        completion_tokens: Option<u32>,
    },
    Error(String),
}

/// Embedding task hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    RetrievalDocument,
    RetrievalQuery,
}

/// Streaming chat request
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    /// Prior turns, oldest first
    pub history: Vec<Content>,
    /// Sent as the final user turn
    pub prompt: String,
    pub temperature: Option<f32>,
}

/// One conversation turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(text: impl Into<String>) -> Self {
        Self::with_role("user", text)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::with_role("model", text)
    }

    fn with_role(role: &str, text: impl Into<String>) -> Self {
        Self {
            role: Some(role.to_string()),
            parts: vec![Part {
                text: Some(text.into()),
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

// Internal Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest {
    model: String,
    content: Content,
    task_type: TaskType,
}

impl EmbedContentRequest {
    fn new(model: &str, text: &str, task: TaskType) -> Self {
        Self {
            model: qualified_model(model),
            content: Content {
                role: None,
                parts: vec![Part {
                    text: Some(text.to_string()),
                }],
            },
            task_type: task,
        }
    }
}

#[derive(Debug, Serialize)]
struct BatchEmbedContentsRequest {
    requests: Vec<EmbedContentRequest>,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedContentsResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    #[serde(default)]
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: Option<u32>,
    #[serde(default)]
    candidates_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

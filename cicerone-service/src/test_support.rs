//! Helpers shared by unit tests.

use axum::{
    Json, Router,
    extract::{Path, Query},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::{DynamicConfig, RuntimeConfig, StaticConfig};
use crate::service::CiceroneService;

/// Prompts containing this marker make the mock model answer with an error.
pub const FAIL_MARKER: &str = "trigger-model-error";

/// The mock model reports the prompt as blocked, inside a 200 event stream.
pub const BLOCK_MARKER: &str = "trigger-prompt-block";

/// The mock model streams `Hel`, then an error event, then `lo`.
pub const STREAM_ERROR_MARKER: &str = "trigger-stream-error";

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn spawn_mock_server(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Keyword embedding over [port, beach, temple]
pub fn keyword_embedding(text: &str) -> Vec<f32> {
    let text = text.to_lowercase();
    ["port", "beach", "temple"]
        .iter()
        .map(|word| if text.contains(word) { 1.0 } else { 0.0 })
        .collect()
}

/// One server standing in for the model API, the search page and the encyclopedia.
///
/// The streaming endpoint echoes the request back: first `turns=N\n` with the
/// number of history turns, then the final prompt text.
pub async fn spawn_mock_backend() -> String {
    let app = Router::new()
        .route(
            "/v1beta/models",
            get(|| async { Json(serde_json::json!({ "models": [] })) }),
        )
        .route("/v1beta/models/{method}", post(mock_model))
        .route(
            "/search",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                let query = params.get("q").cloned().unwrap_or_default();
                Html(format!(
                    r#"<html><body><div class="g"><h3>{}</h3><div class="VwiC3b">Fish curry and neer dosa.</div></div></body></html>"#,
                    query
                ))
            }),
        )
        .route(
            "/api/rest_v1/page/summary/{title}",
            get(|| async {
                Json(serde_json::json!({ "extract": "Mangalore is a major port city." }))
            }),
        );

    spawn_mock_server(app).await
}

async fn mock_model(Path(method): Path<String>, Json(body): Json<serde_json::Value>) -> Response {
    let text_of = |value: &serde_json::Value| {
        value["parts"][0]["text"].as_str().unwrap_or_default().to_string()
    };

    if method.ends_with(":batchEmbedContents") {
        let embeddings: Vec<_> = body["requests"]
            .as_array()
            .into_iter()
            .flatten()
            .map(|r| serde_json::json!({ "values": keyword_embedding(&text_of(&r["content"])) }))
            .collect();
        return Json(serde_json::json!({ "embeddings": embeddings })).into_response();
    }

    if method.ends_with(":embedContent") {
        let values = keyword_embedding(&text_of(&body["content"]));
        return Json(serde_json::json!({ "embedding": { "values": values } })).into_response();
    }

    let contents = body["contents"].as_array().cloned().unwrap_or_default();
    let prompt = contents.last().map(text_of).unwrap_or_default();
    if prompt.contains(FAIL_MARKER) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({ "error": { "code": 429, "message": "quota exceeded" } })),
        )
            .into_response();
    }

    let data = |value: serde_json::Value| format!("data: {}\r\n\r\n", value);
    let event = |text: &str| {
        data(serde_json::json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] }))
    };

    if prompt.contains(BLOCK_MARKER) {
        let sse = data(serde_json::json!({ "promptFeedback": { "blockReason": "SAFETY" } }));
        return ([("content-type", "text/event-stream")], sse).into_response();
    }

    if prompt.contains(STREAM_ERROR_MARKER) {
        let sse = format!(
            "{}{}{}",
            event("Hel"),
            data(serde_json::json!({ "error": { "code": 500, "message": "backend went away" } })),
            event("lo")
        );
        return ([("content-type", "text/event-stream")], sse).into_response();
    }

    let sse = format!(
        "{}{}",
        event(&format!("turns={}\n", contents.len().saturating_sub(1))),
        event(&prompt)
    );

    ([("content-type", "text/event-stream")], sse).into_response()
}

/// A service wired to the mock backend. With `with_document`, a three
/// paragraph guide is written to `dir` as the indexed document.
pub async fn test_service(
    backend: &str,
    dir: &std::path::Path,
    with_document: bool,
) -> Arc<CiceroneService> {
    let document_path = dir.join("guide.txt");
    if with_document {
        std::fs::write(&document_path, "The old port\n\nSandy beach\n\nA hill temple").unwrap();
    }

    let static_config: StaticConfig = serde_json::from_value(serde_json::json!({
        "storage": {
            "document_path": document_path,
            "data_dir": dir.join("data"),
        },
        "gemini": {
            "api_key": "test-key",
            "base_url": backend,
            "request_timeout_secs": 5,
        },
    }))
    .unwrap();

    let mut dynamic = DynamicConfig::default();
    dynamic.embeddings.chunk_size = 20;
    dynamic.embeddings.chunk_overlap = 0;
    dynamic.fallback.search_url = format!("{}/search", backend);
    dynamic.fallback.wikipedia_url = backend.to_string();

    let runtime_config = Arc::new(RuntimeConfig::new(static_config, dynamic));
    Arc::new(CiceroneService::new(runtime_config).await.unwrap())
}

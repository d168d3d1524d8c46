//! HTTP API for the Cicerone service.
//!
//! This module provides:
//! - The chat widget and the streaming chat endpoint
//! - Health and metrics monitoring
//! - Index status and runtime settings

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::{Html, IntoResponse},
    routing::{get, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::i18n::Message;
use crate::search::{IndexPhase, IndexStatus};
use crate::service::CiceroneService;

pub mod chat;
pub mod settings;
use chat::chat_handler;
use settings::{get_settings_handler, update_settings_handler};

const WIDGET_HTML: &str = include_str!("../static/index.html");

/// Application state
pub struct AppState {
    pub service: Arc<CiceroneService>,
    pub start_time: Instant,
    pub metrics: Option<PrometheusHandle>,
}

/// Build the API router
pub fn router(service: Arc<CiceroneService>, metrics: Option<PrometheusHandle>) -> Router {
    let state = Arc::new(AppState {
        service,
        start_time: Instant::now(),
        metrics,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/chat", post(chat_handler))
        .route("/index", get(index_status_handler))
        .route(
            "/settings",
            get(get_settings_handler).put(update_settings_handler),
        );

    Router::new()
        .route("/", get(widget_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .nest("/api", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn widget_handler() -> Html<&'static str> {
    Html(WIDGET_HTML)
}

// === Health & Metrics ===

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let model_available = state.service.gemini.health_check().await.unwrap_or(false);
    let index_ready = state.service.search.is_ready();
    let i18n = &state.service.i18n;

    let status = if !model_available {
        i18n.format(
            Message::HealthStatusDegraded,
            &[("reason", "Gemini API unavailable")],
        )
    } else if !index_ready {
        i18n.format(
            Message::HealthStatusDegraded,
            &[("reason", "document index not ready")],
        )
    } else {
        i18n.text(Message::HealthStatusHealthy)
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        model_available,
        index_ready,
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_seconds: u64,
    model_available: bool,
    index_ready: bool,
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = state
        .metrics
        .as_ref()
        .map(PrometheusHandle::render)
        .unwrap_or_default();

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
}

// === Index ===

#[derive(Serialize)]
struct IndexStatusResponse {
    #[serde(flatten)]
    status: IndexStatus,
    message: String,
}

async fn index_status_handler(State(state): State<Arc<AppState>>) -> Json<IndexStatusResponse> {
    let status = state.service.search.status();
    let i18n = &state.service.i18n;
    let document = status.document.clone().unwrap_or_default();
    let chunks = status.chunks.unwrap_or_default().to_string();

    let message = match status.phase {
        IndexPhase::Building => {
            i18n.format(Message::IndexBuilding, &[("document", document.as_str())])
        }
        IndexPhase::Ready => i18n.format(
            Message::IndexReady,
            &[("chunks", chunks.as_str()), ("document", document.as_str())],
        ),
        IndexPhase::Failed => i18n.format(
            Message::IndexFailed,
            &[("reason", status.error.as_deref().unwrap_or_default())],
        ),
        IndexPhase::Missing => i18n.text(Message::IndexMissing),
    };

    Json(IndexStatusResponse { status, message })
}

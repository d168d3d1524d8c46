use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::net::TcpListener;
use tracing::{info, warn};

mod api;
mod config;
mod error;
mod gemini;
mod i18n;
mod index;
mod ingestion;
mod search;
mod service;
mod web;

#[cfg(test)]
mod test_support;

use crate::config::RuntimeConfig;
use crate::service::CiceroneService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    init_logging();

    info!("Starting Cicerone service v{}", env!("CARGO_PKG_VERSION"));

    // Load static + dynamic configuration (config file, then CICERONE__* env)
    let runtime_config = Arc::new(RuntimeConfig::load()?);
    info!(
        host = %runtime_config.static_config.server.host,
        port = runtime_config.static_config.server.port,
        document = %runtime_config.static_config.storage.document_path.display(),
        "Configuration loaded"
    );

    let metrics = install_metrics_recorder();

    // Initialize the service
    let service = Arc::new(CiceroneService::new(runtime_config.clone()).await?);

    // Index the document in the background; until it is ready, questions are
    // answered from the web fallback
    let index_service = service.clone();
    tokio::spawn(async move {
        index_service.build_index().await;
    });

    // Build the router
    let app = api::router(service, metrics);

    // Start the server
    let addr = format!(
        "{}:{}",
        runtime_config.static_config.server.host, runtime_config.static_config.server.port
    );
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let format = fmt::format()
        .with_target(true)
        .with_thread_ids(true)
        .compact();

    // Use RUST_LOG if set, otherwise default to info level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("cicerone_service=info,tower_http=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().event_format(format))
        .with(filter)
        .init();
}

/// Install the Prometheus recorder. Metrics are disabled if installation fails.
fn install_metrics_recorder() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let upkeep = handle.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_secs(5));
                loop {
                    interval.tick().await;
                    upkeep.run_upkeep();
                }
            });
            Some(handle)
        }
        Err(e) => {
            warn!(error = %e, "Failed to install metrics recorder, /metrics will be empty");
            None
        }
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => warn!(error = %e, "Failed to listen for shutdown signal"),
    }
}

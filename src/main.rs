//! Exporter binary: config loading, logging, and the /metrics listener.

use std::sync::Arc;

use anyhow::Context;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use prometheus::{Encoder, Registry, TextEncoder};
use tracing_subscriber::EnvFilter;

use cachemgr_exporter::{build_registry, ExporterConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => ExporterConfig::from_file(&path)
            .with_context(|| format!("failed to load config from {}", path))?,
        None => ExporterConfig::default(),
    };

    let registry = Arc::new(build_registry(&config).context("failed to build exporter")?);

    tracing::info!(
        host = %config.hostname,
        port = config.port,
        listen = %config.listen_address,
        "starting cachemgr exporter"
    );

    let app = Router::new()
        .route("/", get(index))
        .route("/metrics", get(metrics))
        .with_state(registry);

    let listener = tokio::net::TcpListener::bind(&config.listen_address)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_address))?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn index() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/html")],
        "<html><head><title>cachemgr exporter</title></head>\
         <body><h1>cachemgr exporter</h1><p><a href=\"/metrics\">Metrics</a></p></body></html>",
    )
}

/// Scrape handler. The collection cycle performs blocking network I/O, so
/// it runs on the blocking pool rather than the async executor.
async fn metrics(State(registry): State<Arc<Registry>>) -> impl IntoResponse {
    let gathered = tokio::task::spawn_blocking(move || registry.gather()).await;

    let families = match gathered {
        Ok(families) => families,
        Err(e) => {
            tracing::error!(error = %e, "collection task panicked");
            return (StatusCode::INTERNAL_SERVER_ERROR, String::new()).into_response();
        }
    };

    let encoder = TextEncoder::new();
    let mut buf = Vec::new();
    if let Err(e) = encoder.encode(&families, &mut buf) {
        tracing::error!(error = %e, "failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, String::new()).into_response();
    }

    (
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buf,
    )
        .into_response()
}

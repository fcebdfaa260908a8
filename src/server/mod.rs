//! HTTP surface of the prediction service

pub mod handlers;

use crate::config::ServerConfig;
use crate::context::PredictorContext;
use crate::metrics::ServiceMetrics;
use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub context: Arc<PredictorContext>,
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    pub fn new(context: Arc<PredictorContext>, metrics: Arc<ServiceMetrics>) -> Self {
        Self { context, metrics }
    }
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/predict", post(handlers::predict))
        .route("/ranges", get(handlers::ranges))
        .route("/classes", get(handlers::classes))
        .route("/gpa_info", get(handlers::gpa_info))
        .route("/sample", get(handlers::sample))
        .route("/dataset_stats", get(handlers::dataset_stats))
        .route("/metrics", get(handlers::metrics))
        .route("/health", get(handlers::health))
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(config: &ServerConfig, state: AppState) -> Result<()> {
    let app = router(state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "Prediction server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Prediction server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}

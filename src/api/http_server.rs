// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{
    detect::{batch_detect_handler, detect_handler},
    errors::ApiError,
    handlers::{health_handler, models_handler},
    session::{end_session_handler, session_history_handler, start_session_handler},
};
use crate::sessions::SessionStore;
use crate::vision::{AnnotationStore, DetectorMode, ModelRegistry, ModelRegistryConfig};

/// Default number of frames accepted by /api/detect/batch
pub const DEFAULT_MAX_BATCH_SIZE: usize = 10;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ModelRegistry>,
    pub sessions: Arc<SessionStore>,
    /// Set when annotated frames are written to disk
    pub annotations: Option<Arc<AnnotationStore>>,
    pub max_batch_size: usize,
}

impl AppState {
    pub fn new(registry: ModelRegistry, sessions: SessionStore) -> Self {
        Self {
            registry: Arc::new(registry),
            sessions: Arc::new(sessions),
            annotations: None,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }

    /// Mock models with a fixed seed and no simulated latency
    pub fn new_for_test() -> Self {
        let config = ModelRegistryConfig {
            mode: DetectorMode::Mock,
            simulate_latency: false,
            mock_seed: Some(42),
            ..ModelRegistryConfig::default()
        };
        Self::new(ModelRegistry::load(&config), SessionStore::default())
    }

    pub fn with_annotations(mut self, store: AnnotationStore) -> Self {
        self.annotations = Some(Arc::new(store));
        self
    }

    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/models", get(models_handler))
        .route("/api/detect", post(detect_handler))
        .route("/api/detect/batch", post(batch_detect_handler))
        .route("/api/session/start", post(start_session_handler))
        .route("/api/session/end", post(end_session_handler))
        .route("/api/session/history", get(session_history_handler))
        .fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn fallback_handler() -> ApiError {
    ApiError::NotFound("Endpoint not found".to_string())
}

pub async fn start_server(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Parser;
use drowsiness_detection_api::{
    api::{start_server, AppState},
    cli::Cli,
    sessions::SessionStore,
    version,
    vision::{AnnotationStore, ModelRegistry},
};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let config = cli.load_config().context("Failed to load configuration")?;

    let level = if config.debug { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    info!("Starting {}", version::get_version_string());
    info!(
        "Model mode: {}, model dir: {}",
        config.model_mode,
        config.model_dir.display()
    );

    let registry = ModelRegistry::load(&config.registry_config());
    let stats = registry.stats();
    info!(
        "Models ready: {} total ({} mock, {} onnx)",
        stats.total_models, stats.mock_models, stats.onnx_models
    );
    if stats.total_models == 0 {
        tracing::warn!("No detection models available; /api/detect will reject every request");
    }

    let mut state = AppState::new(registry, SessionStore::new(config.max_sessions))
        .with_max_batch_size(config.max_batch_size);

    if let Some(ref dir) = config.annotated_output_dir {
        let store = AnnotationStore::new(dir).with_context(|| {
            format!("Failed to create annotated output dir {}", dir.display())
        })?;
        info!("Writing annotated frames to {}", dir.display());
        state = state.with_annotations(store);
    }

    start_server(config.socket_addr()?, state).await
}

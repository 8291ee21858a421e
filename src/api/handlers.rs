// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{extract::State, Json};

use super::http_server::AppState;
use super::response_formatter::{format_health, format_models, HealthResponse, ModelsResponse};

/// GET /api/health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(format_health(&state.registry))
}

/// GET /api/models - every known model, with availability
pub async fn models_handler(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(format_models(state.registry.model_info()))
}

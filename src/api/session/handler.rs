// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Session endpoint handlers

use axum::{body::Bytes, extract::State, Json};
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use super::request::{EndSessionRequest, StartSessionRequest};
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::api::response_formatter::{
    format_session, format_session_history, SessionData, SessionHistoryResponse, SessionResponse,
};

/// Parse an optional JSON body; an empty body means all defaults
fn optional_json<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(T::default());
    }

    serde_json::from_slice(body).map_err(|e| {
        warn!("Rejected session request body: {}", e);
        ApiError::InvalidRequest("Invalid JSON body".to_string())
    })
}

/// POST /api/session/start
pub async fn start_session_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SessionResponse>, ApiError> {
    let request: StartSessionRequest = optional_json(&body)?;
    request.validate()?;

    let settings = request.settings.unwrap_or_default();
    if !state.registry.is_model_loaded(&settings.model) {
        warn!("Session started with unavailable model {}", settings.model);
    }

    let record = state.sessions.start(settings).await?;

    Ok(Json(format_session(
        &record.id,
        "started",
        Some("Detection session started successfully"),
        Some(SessionData {
            start_time: Some(record.start_time.to_rfc3339()),
            settings: Some(record.settings),
            ..SessionData::default()
        }),
    )))
}

/// POST /api/session/end
///
/// # Errors
/// - 400: missing session id
/// - 404: unknown session
/// - 409: session already ended
pub async fn end_session_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SessionResponse>, ApiError> {
    let request: EndSessionRequest = optional_json(&body)?;
    let session_id = request.session_id()?;

    let record = state.sessions.end(session_id).await?;

    info!(
        "Session {} summary: {} frames, {} drowsy, {} alerts",
        record.id,
        record.summary.total_frames,
        record.summary.drowsy_frames,
        record.summary.alerts_triggered
    );

    Ok(Json(format_session(
        &record.id,
        "ended",
        Some("Detection session ended successfully"),
        Some(SessionData {
            end_time: record.end_time.map(|t| t.to_rfc3339()),
            summary: Some(record.summary),
            ..SessionData::default()
        }),
    )))
}

/// GET /api/session/history - all sessions of this process, newest first
pub async fn session_history_handler(
    State(state): State<AppState>,
) -> Json<SessionHistoryResponse> {
    Json(format_session_history(state.sessions.history().await))
}

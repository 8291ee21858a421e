// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection endpoint handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use image::DynamicImage;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::request::{BatchDetectRequest, DetectRequest};
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::api::response_formatter::{
    format_batch, format_detection, BatchItem, BatchResponse, DetectionResponse,
};
use crate::vision::{decode_base64_image, DetectionOutcome, Detector, DetectorError, ImageError};

/// Why a single frame could not be processed
#[derive(Debug)]
enum FrameError {
    Decode(ImageError),
    Inference(DetectorError),
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameError::Decode(e) => write!(f, "{}", e),
            FrameError::Inference(e) => write!(f, "{}", e),
        }
    }
}

struct FrameResult {
    image: DynamicImage,
    outcome: DetectionOutcome,
    /// Seconds spent in the model
    inference_time: f64,
}

/// Decode and run one frame on the blocking pool
async fn run_frame(
    detector: Arc<dyn Detector>,
    image_data: String,
    confidence_threshold: Option<f32>,
) -> Result<Result<FrameResult, FrameError>, ApiError> {
    tokio::task::spawn_blocking(move || -> Result<FrameResult, FrameError> {
        let (image, info) = decode_base64_image(&image_data).map_err(FrameError::Decode)?;
        debug!(
            "Decoded frame: {}x{} {:?}, {} bytes",
            info.width, info.height, info.format, info.size_bytes
        );

        let start = Instant::now();
        let outcome = detector.detect(&image).map_err(FrameError::Inference)?;
        let inference_time = start.elapsed().as_secs_f64();

        let outcome = match confidence_threshold {
            Some(threshold) if outcome.confidence < threshold => {
                debug!(
                    "{} ({:.3}) below threshold {:.3}",
                    outcome.class_name, outcome.confidence, threshold
                );
                DetectionOutcome::no_detection()
            }
            _ => outcome,
        };

        Ok(FrameResult {
            image,
            outcome,
            inference_time,
        })
    })
    .await
    .map_err(|e| ApiError::InternalError(format!("Detection task failed: {}", e)))
}

/// Format the frame, write its annotation and count it towards the session
async fn finish_frame(
    state: &AppState,
    frame: FrameResult,
    model: &str,
    session_id: Option<String>,
) -> DetectionResponse {
    let mut response = format_detection(&frame.outcome, model, frame.inference_time, session_id);

    if let Some(store) = state.annotations.clone() {
        let id = response.id.clone();
        let outcome = frame.outcome.clone();
        let image = frame.image;
        match tokio::task::spawn_blocking(move || store.save(&id, &image, &outcome)).await {
            Ok(path) => response.annotated_image = path.map(|p| p.display().to_string()),
            Err(e) => warn!("Annotation task failed: {}", e),
        }
    }

    if let Some(ref session_id) = response.session_id {
        state
            .sessions
            .record_detection(
                session_id,
                response.is_drowsy,
                response.confidence as f32,
                response.alert_triggered,
            )
            .await;
    }

    response
}

fn lookup_model(state: &AppState, name: &str) -> Result<Arc<dyn Detector>, ApiError> {
    state.registry.get_model(name).ok_or_else(|| {
        warn!("Requested model {} is not available", name);
        ApiError::ModelNotAvailable(name.to_string())
    })
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        warn!("Rejected request body: {}", rejection);
        ApiError::InvalidRequest("Invalid JSON body".to_string())
    })
}

/// POST /api/detect - Run one frame through a model
///
/// # Errors
/// - 400: no image, unknown model, undecodable image, bad threshold
/// - 500: inference failed
pub async fn detect_handler(
    State(state): State<AppState>,
    payload: Result<Json<DetectRequest>, JsonRejection>,
) -> Result<Json<DetectionResponse>, ApiError> {
    let request = json_body(payload)?;

    if let Err(e) = request.validate() {
        warn!("Detect validation failed: {}", e);
        return Err(e);
    }

    let detector = lookup_model(&state, &request.model)?;
    let image_data = request.image.unwrap_or_default();

    let frame = match run_frame(detector, image_data, request.confidence_threshold).await? {
        Ok(frame) => frame,
        Err(FrameError::Decode(e)) => {
            warn!("Failed to decode image: {}", e);
            return Err(ApiError::InvalidRequest(
                "Invalid image data format".to_string(),
            ));
        }
        Err(FrameError::Inference(e)) => {
            return Err(ApiError::InternalError(format!(
                "{} inference failed: {}",
                request.model, e
            )));
        }
    };

    let response = finish_frame(&state, frame, &request.model, request.session_id).await;

    info!(
        "Detection completed: {} (confidence: {:.3}, model: {})",
        if response.is_drowsy { "DROWSY" } else { "ALERT" },
        response.confidence,
        response.model_used
    );

    Ok(Json(response))
}

/// POST /api/detect/batch - Run up to `max_batch_size` frames through one model
///
/// A frame that fails to decode or infer becomes an error entry; the batch
/// itself still succeeds.
pub async fn batch_detect_handler(
    State(state): State<AppState>,
    payload: Result<Json<BatchDetectRequest>, JsonRejection>,
) -> Result<Json<BatchResponse>, ApiError> {
    let request = json_body(payload)?;

    if let Err(e) = request.validate(state.max_batch_size) {
        warn!("Batch validation failed: {}", e);
        return Err(e);
    }

    let detector = lookup_model(&state, &request.model)?;
    let images = request.images.unwrap_or_default();

    let start = Instant::now();
    let mut results = Vec::with_capacity(images.len());

    for (index, image_data) in images.into_iter().enumerate() {
        let item = match run_frame(detector.clone(), image_data, request.confidence_threshold)
            .await?
        {
            Ok(frame) => {
                let response =
                    finish_frame(&state, frame, &request.model, request.session_id.clone()).await;
                BatchItem::detection(index, response)
            }
            Err(e) => {
                warn!("Error processing image {}: {}", index, e);
                BatchItem::error(index, e)
            }
        };
        results.push(item);
    }

    let total_time = start.elapsed().as_secs_f64();
    let response = format_batch(results, total_time, &request.model, request.session_id);

    info!(
        "Batch processing completed: {} images ({} failed) in {:.2}s",
        response.results.len(),
        response.summary.failed_detections,
        total_time
    );

    Ok(Json(response))
}

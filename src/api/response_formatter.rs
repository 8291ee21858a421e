// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! JSON shapes returned to the mobile client

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::sessions::{SessionRecord, SessionSettings, SessionSummary};
use crate::version;
use crate::vision::{
    AlertLevel, BoundingBox, ClassCategory, DetectionOutcome, ModelInfo, ModelRegistry,
};

/// Drowsy detections above this confidence raise an alert
pub const ALERT_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// ISO-8601 UTC timestamp with millisecond precision
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `<model>_<unix millis>_<8 hex>`, unique even within one millisecond
fn detection_id(model: &str, unix_millis: i64) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}_{}_{}", model, unix_millis, &suffix[..8])
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResponse {
    /// `<model>_<unix-millis>`
    pub id: String,
    pub timestamp: String,
    pub is_drowsy: bool,
    pub confidence: f64,
    pub model_used: String,
    /// Seconds
    pub inference_time: f64,
    pub alert_triggered: bool,
    pub status: String,
    pub class_name: String,
    pub class_id: u32,
    pub category: ClassCategory,
    pub alert_level: AlertLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Path of the annotated frame, when annotation is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotated_image: Option<String>,
}

pub fn format_detection(
    outcome: &DetectionOutcome,
    model: &str,
    inference_time: f64,
    session_id: Option<String>,
) -> DetectionResponse {
    let now = Utc::now();
    let confidence = round3(outcome.confidence as f64);

    DetectionResponse {
        id: detection_id(model, now.timestamp_millis()),
        timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        is_drowsy: outcome.is_drowsy,
        confidence,
        model_used: model.to_string(),
        inference_time: round3(inference_time),
        alert_triggered: outcome.is_drowsy && confidence > ALERT_CONFIDENCE_THRESHOLD,
        status: "success".to_string(),
        class_name: outcome.class_name.clone(),
        class_id: outcome.class_id,
        category: outcome.category,
        alert_level: outcome.alert_level,
        bbox: outcome.bbox,
        session_id,
        annotated_image: None,
    }
}

/// One entry of a batch: a detection or the error for that image
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum BatchItem {
    Detection {
        index: usize,
        #[serde(flatten)]
        detection: DetectionResponse,
    },
    Error {
        index: usize,
        status: String,
        message: String,
        timestamp: String,
    },
}

impl BatchItem {
    pub fn detection(index: usize, detection: DetectionResponse) -> Self {
        BatchItem::Detection { index, detection }
    }

    pub fn error(index: usize, reason: impl std::fmt::Display) -> Self {
        BatchItem::Error {
            index,
            status: "error".to_string(),
            message: format!("Error processing image {}: {}", index, reason),
            timestamp: timestamp_now(),
        }
    }

    pub fn index(&self) -> usize {
        match self {
            BatchItem::Detection { index, .. } | BatchItem::Error { index, .. } => *index,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    /// Successful detections only
    pub total_detections: usize,
    pub drowsy_detections: usize,
    pub failed_detections: usize,
    pub alert_rate: f64,
    pub average_confidence: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub status: String,
    pub results: Vec<BatchItem>,
    pub summary: BatchSummary,
    pub total_inference_time: f64,
    pub model_used: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

pub fn summarize_batch(results: &[BatchItem]) -> BatchSummary {
    let detections: Vec<&DetectionResponse> = results
        .iter()
        .filter_map(|item| match item {
            BatchItem::Detection { detection, .. } => Some(detection),
            BatchItem::Error { .. } => None,
        })
        .collect();

    let total = detections.len();
    let drowsy = detections.iter().filter(|d| d.is_drowsy).count();
    let average_confidence = if total == 0 {
        0.0
    } else {
        detections.iter().map(|d| d.confidence).sum::<f64>() / total as f64
    };

    BatchSummary {
        total_detections: total,
        drowsy_detections: drowsy,
        failed_detections: results.len() - total,
        alert_rate: round3(drowsy as f64 / total.max(1) as f64),
        average_confidence: round3(average_confidence),
    }
}

pub fn format_batch(
    results: Vec<BatchItem>,
    total_inference_time: f64,
    model: &str,
    session_id: Option<String>,
) -> BatchResponse {
    BatchResponse {
        status: "success".to_string(),
        summary: summarize_batch(&results),
        results,
        total_inference_time: round3(total_inference_time),
        model_used: model.to_string(),
        timestamp: timestamp_now(),
        session_id,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// "healthy", or "degraded" when no model is loaded
    pub status: String,
    pub timestamp: String,
    pub models_loaded: Vec<String>,
    pub server: String,
    pub mode: String,
    pub version: String,
}

pub fn format_health(registry: &ModelRegistry) -> HealthResponse {
    let models_loaded = registry.loaded_models();
    let status = if models_loaded.is_empty() {
        "degraded"
    } else {
        "healthy"
    };

    HealthResponse {
        status: status.to_string(),
        timestamp: timestamp_now(),
        models_loaded,
        server: version::SERVER_NAME.to_string(),
        mode: registry.mode().to_string(),
        version: version::VERSION.to_string(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelsResponse {
    pub status: String,
    pub models: Vec<ModelInfo>,
    pub total_models: usize,
    pub timestamp: String,
}

pub fn format_models(models: Vec<ModelInfo>) -> ModelsResponse {
    ModelsResponse {
        status: "success".to_string(),
        total_models: models.len(),
        models,
        timestamp: timestamp_now(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<SessionSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SessionSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub status: String,
    pub session_id: String,
    /// "started" or "ended"
    pub action: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_data: Option<SessionData>,
}

pub fn format_session(
    session_id: &str,
    action: &str,
    message: Option<&str>,
    session_data: Option<SessionData>,
) -> SessionResponse {
    SessionResponse {
        status: "success".to_string(),
        session_id: session_id.to_string(),
        action: action.to_string(),
        timestamp: timestamp_now(),
        message: message.map(String::from),
        session_data,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionHistoryResponse {
    pub status: String,
    pub sessions: Vec<SessionRecord>,
    pub total_sessions: usize,
    pub total_drowsy_detections: u64,
    pub timestamp: String,
}

pub fn format_session_history(sessions: Vec<SessionRecord>) -> SessionHistoryResponse {
    SessionHistoryResponse {
        status: "success".to_string(),
        total_sessions: sessions.len(),
        total_drowsy_detections: sessions.iter().map(|s| s.summary.drowsy_frames).sum(),
        sessions,
        timestamp: timestamp_now(),
    }
}

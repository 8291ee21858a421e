// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection request types and validation

use serde::{Deserialize, Serialize};

use crate::api::errors::ApiError;

pub(crate) fn default_model() -> String {
    "yolo".to_string()
}

/// `confidenceThreshold` must be a probability
pub(crate) fn validate_threshold(threshold: Option<f32>) -> Result<(), ApiError> {
    match threshold {
        Some(t) if !(0.0..=1.0).contains(&t) || t.is_nan() => Err(ApiError::ValidationError {
            field: "confidenceThreshold".to_string(),
            message: "must be between 0 and 1".to_string(),
            received_value: Some(t.to_string()),
        }),
        _ => Ok(()),
    }
}

/// Request for POST /api/detect
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectRequest {
    /// Base64-encoded frame, optionally as a data URL
    #[serde(default)]
    pub image: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub session_id: Option<String>,

    /// Detections below this confidence are reported as no detection
    #[serde(default)]
    pub confidence_threshold: Option<f32>,
}

impl DetectRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.image.as_deref().map(str::trim).unwrap_or("").is_empty() {
            return Err(ApiError::InvalidRequest(
                "No image data provided".to_string(),
            ));
        }

        validate_threshold(self.confidence_threshold)
    }
}

/// Request for POST /api/detect/batch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDetectRequest {
    #[serde(default)]
    pub images: Option<Vec<String>>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub session_id: Option<String>,

    #[serde(default)]
    pub confidence_threshold: Option<f32>,
}

impl BatchDetectRequest {
    pub fn validate(&self, max_batch_size: usize) -> Result<(), ApiError> {
        let images = self.images.as_ref().ok_or_else(|| {
            ApiError::InvalidRequest("No images data provided".to_string())
        })?;

        if images.len() > max_batch_size {
            return Err(ApiError::InvalidRequest(format!(
                "Batch size too large (max {} images)",
                max_batch_size
            )));
        }

        validate_threshold(self.confidence_threshold)
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::sessions::SessionError;

/// JSON body of every error response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>, error_code: Option<&str>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            timestamp: super::response_formatter::timestamp_now(),
            error_code: error_code.map(String::from),
            details: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Malformed or incomplete request; the message is returned verbatim
    InvalidRequest(String),
    ValidationError {
        field: String,
        message: String,
        received_value: Option<String>,
    },
    ModelNotAvailable(String),
    NotFound(String),
    Conflict(String),
    ServiceUnavailable(String),
    /// Details are logged, never returned to the client
    InternalError(String),
}

impl ApiError {
    pub fn to_response(&self) -> ErrorResponse {
        match self {
            ApiError::InvalidRequest(msg) => ErrorResponse::new(msg.clone(), None),
            ApiError::ValidationError {
                field,
                message,
                received_value,
            } => {
                let mut details = serde_json::json!({
                    "field": field,
                    "validationMessage": message,
                });
                if let Some(value) = received_value {
                    details["receivedValue"] = serde_json::Value::String(value.clone());
                }

                let mut response = ErrorResponse::new(
                    format!("Validation error in field '{}': {}", field, message),
                    Some("VALIDATION_ERROR"),
                );
                response.details = Some(details);
                response
            }
            ApiError::ModelNotAvailable(model) => {
                ErrorResponse::new(format!("Model {} not available", model), None)
            }
            ApiError::NotFound(msg) => ErrorResponse::new(msg.clone(), Some("NOT_FOUND")),
            ApiError::Conflict(msg) => ErrorResponse::new(msg.clone(), Some("CONFLICT")),
            ApiError::ServiceUnavailable(msg) => {
                ErrorResponse::new(msg.clone(), Some("SERVICE_UNAVAILABLE"))
            }
            ApiError::InternalError(_) => {
                ErrorResponse::new("Internal server error", Some("INTERNAL_ERROR"))
            }
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidRequest(_)
            | ApiError::ValidationError { .. }
            | ApiError::ModelNotAvailable(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::ServiceUnavailable(_) => 503,
            ApiError::InternalError(_) => 500,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::ValidationError { field, message, .. } => {
                write!(f, "Validation error for {}: {}", field, message)
            }
            ApiError::ModelNotAvailable(model) => write!(f, "Model {} not available", model),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotFound(_) => ApiError::NotFound(e.to_string()),
            SessionError::AlreadyEnded(_) => ApiError::Conflict(e.to_string()),
            SessionError::CapacityReached(_) => ApiError::ServiceUnavailable(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::InternalError(ref detail) = self {
            tracing::error!("Request failed: {}", detail);
        }

        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_response())).into_response()
    }
}

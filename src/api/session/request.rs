// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Session request types

use serde::{Deserialize, Serialize};

use crate::api::detect::request::validate_threshold;
use crate::api::errors::ApiError;
use crate::sessions::SessionSettings;

/// Request for POST /api/session/start
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    #[serde(default)]
    pub settings: Option<SessionSettings>,
}

impl StartSessionRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        match self.settings {
            Some(ref settings) => validate_threshold(Some(settings.confidence_threshold)),
            None => Ok(()),
        }
    }
}

/// Request for POST /api/session/end
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndSessionRequest {
    #[serde(default)]
    pub session_id: Option<String>,
}

impl EndSessionRequest {
    /// The session id, or the 400 error when it is missing
    pub fn session_id(&self) -> Result<&str, ApiError> {
        match self.session_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err(ApiError::InvalidRequest("Session ID required".to_string())),
        }
    }
}

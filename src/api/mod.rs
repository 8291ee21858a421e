// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod detect;
pub mod errors;
pub mod handlers;
pub mod http_server;
pub mod response_formatter;
pub mod session;

pub use detect::{batch_detect_handler, detect_handler, BatchDetectRequest, DetectRequest};
pub use errors::{ApiError, ErrorResponse};
pub use handlers::{health_handler, models_handler};
pub use http_server::{create_app, start_server, AppState};
pub use response_formatter::{
    BatchItem, BatchResponse, BatchSummary, DetectionResponse, HealthResponse, ModelsResponse,
    SessionHistoryResponse, SessionResponse,
};
pub use session::{
    end_session_handler, session_history_handler, start_session_handler, EndSessionRequest,
    StartSessionRequest,
};

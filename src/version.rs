// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the Drowsiness Detection API

/// Semantic version number, reported by `/api/health`
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Server name reported by `/api/health`
pub const SERVER_NAME: &str = "axum";

/// Build date
pub const BUILD_DATE: &str = "2025-10-13";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "mock-models",
    "onnx-yolo",
    "onnx-faster-rcnn",
    "hybrid-loading",
    "batch-detection",
    "detection-sessions",
    "annotated-frames",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Drowsiness Detection API {} ({})", VERSION, BUILD_DATE)
}

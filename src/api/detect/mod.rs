// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection API endpoints
//!
//! Provides POST /api/detect and POST /api/detect/batch.

pub mod handler;
pub mod request;

pub use handler::{batch_detect_handler, detect_handler};
pub use request::{BatchDetectRequest, DetectRequest};

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Session API endpoints
//!
//! Provides POST /api/session/start, POST /api/session/end and
//! GET /api/session/history.

pub mod handler;
pub mod request;

pub use handler::{end_session_handler, session_history_handler, start_session_handler};
pub use request::{EndSessionRequest, StartSessionRequest};

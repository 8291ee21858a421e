// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection sessions
//!
//! A session groups the frames a client sends during one drive. Sessions live
//! in memory only and are lost on restart.

pub mod store;

pub use store::{
    SessionError, SessionRecord, SessionSettings, SessionStore, SessionSummary,
    DEFAULT_MAX_SESSIONS,
};

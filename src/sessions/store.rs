// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! In-memory detection session store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

pub const DEFAULT_MAX_SESSIONS: usize = 1000;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SessionError {
    #[error("Session {0} not found")]
    NotFound(String),

    #[error("Session {0} already ended")]
    AlreadyEnded(String),

    #[error("Too many active sessions (max {0})")]
    CapacityReached(usize),
}

fn default_model() -> String {
    "yolo".to_string()
}

fn default_confidence_threshold() -> f32 {
    0.5
}

fn default_frame_interval() -> u64 {
    500
}

fn default_true() -> bool {
    true
}

/// Client-side capture settings attached to a session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSettings {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,

    /// Milliseconds between captured frames
    #[serde(default = "default_frame_interval")]
    pub frame_interval: u64,

    #[serde(default = "default_true")]
    pub auto_start: bool,

    #[serde(default = "default_true")]
    pub enable_preprocessing: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            confidence_threshold: default_confidence_threshold(),
            frame_interval: default_frame_interval(),
            auto_start: true,
            enable_preprocessing: true,
        }
    }
}

/// Aggregated counters of a session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    /// Seconds since start (or until end)
    pub duration: i64,
    pub total_frames: u64,
    pub drowsy_frames: u64,
    pub alerts_triggered: u64,
    pub average_confidence: f32,
}

/// Session as listed by the history endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub summary: SessionSummary,
    pub model_used: String,
    pub is_active: bool,
    pub settings: SessionSettings,
}

#[derive(Debug, Clone)]
struct Session {
    id: String,
    seq: u64,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    settings: SessionSettings,
    total_frames: u64,
    drowsy_frames: u64,
    alerts_triggered: u64,
    confidence_sum: f64,
}

impl Session {
    fn is_active(&self) -> bool {
        self.end_time.is_none()
    }

    fn summary(&self, now: DateTime<Utc>) -> SessionSummary {
        let end = self.end_time.unwrap_or(now);
        let average_confidence = if self.total_frames == 0 {
            0.0
        } else {
            let avg = self.confidence_sum / self.total_frames as f64;
            ((avg * 1000.0).round() / 1000.0) as f32
        };

        SessionSummary {
            duration: (end - self.start_time).num_seconds().max(0),
            total_frames: self.total_frames,
            drowsy_frames: self.drowsy_frames,
            alerts_triggered: self.alerts_triggered,
            average_confidence,
        }
    }

    fn record(&self, now: DateTime<Utc>) -> SessionRecord {
        SessionRecord {
            id: self.id.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
            summary: self.summary(now),
            model_used: self.settings.model.clone(),
            is_active: self.is_active(),
            settings: self.settings.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    sessions: HashMap<String, Session>,
    next_seq: u64,
}

/// Tracks detection sessions for the lifetime of the process
#[derive(Debug)]
pub struct SessionStore {
    inner: RwLock<Inner>,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            max_sessions: max_sessions.max(1),
        }
    }

    /// Open a new session
    ///
    /// When the store is full the oldest ended session is dropped.
    pub async fn start(&self, settings: SessionSettings) -> Result<SessionRecord, SessionError> {
        let mut inner = self.inner.write().await;

        if inner.sessions.len() >= self.max_sessions {
            let oldest_ended = inner
                .sessions
                .values()
                .filter(|s| !s.is_active())
                .min_by_key(|s| s.seq)
                .map(|s| s.id.clone());

            match oldest_ended {
                Some(id) => {
                    debug!("Evicting ended session {}", id);
                    inner.sessions.remove(&id);
                }
                None => return Err(SessionError::CapacityReached(self.max_sessions)),
            }
        }

        let now = Utc::now();
        let id = new_session_id(now);
        let seq = inner.next_seq;
        inner.next_seq += 1;

        let session = Session {
            id: id.clone(),
            seq,
            start_time: now,
            end_time: None,
            settings,
            total_frames: 0,
            drowsy_frames: 0,
            alerts_triggered: 0,
            confidence_sum: 0.0,
        };
        let record = session.record(now);
        inner.sessions.insert(id.clone(), session);

        info!("Session started: {}", id);
        Ok(record)
    }

    /// Count a processed frame towards an active session
    ///
    /// Returns `false` (and changes nothing) for unknown or ended sessions.
    pub async fn record_detection(
        &self,
        id: &str,
        is_drowsy: bool,
        confidence: f32,
        alert_triggered: bool,
    ) -> bool {
        let mut inner = self.inner.write().await;
        match inner.sessions.get_mut(id) {
            Some(session) if session.is_active() => {
                session.total_frames += 1;
                if is_drowsy {
                    session.drowsy_frames += 1;
                }
                if alert_triggered {
                    session.alerts_triggered += 1;
                }
                session.confidence_sum += confidence as f64;
                true
            }
            _ => {
                debug!("Detection not recorded: session {} unknown or ended", id);
                false
            }
        }
    }

    /// Close a session and return its final record
    pub async fn end(&self, id: &str) -> Result<SessionRecord, SessionError> {
        let mut inner = self.inner.write().await;
        let session = inner
            .sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;

        if !session.is_active() {
            return Err(SessionError::AlreadyEnded(id.to_string()));
        }

        let now = Utc::now();
        session.end_time = Some(now);

        info!(
            "Session ended: {} ({} frames, {} drowsy)",
            id, session.total_frames, session.drowsy_frames
        );
        Ok(session.record(now))
    }

    pub async fn get(&self, id: &str) -> Option<SessionRecord> {
        let inner = self.inner.read().await;
        inner.sessions.get(id).map(|s| s.record(Utc::now()))
    }

    /// All sessions, newest first
    pub async fn history(&self) -> Vec<SessionRecord> {
        let inner = self.inner.read().await;
        let now = Utc::now();

        let mut sessions: Vec<&Session> = inner.sessions.values().collect();
        sessions.sort_by(|a, b| b.seq.cmp(&a.seq));
        sessions.into_iter().map(|s| s.record(now)).collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.sessions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// `session_<unix-seconds>_<8 hex>`
fn new_session_id(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("session_{}_{}", now.timestamp(), &suffix[..8])
}

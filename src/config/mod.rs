// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service configuration
//!
//! Values come from an optional TOML file; command-line flags and environment
//! variables (see `cli`) override them.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::sessions::DEFAULT_MAX_SESSIONS;
use crate::vision::{DetectorMode, DetectorThresholds, ModelRegistryConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    /// Log at DEBUG instead of INFO
    pub debug: bool,
    pub model_dir: PathBuf,
    pub model_mode: DetectorMode,
    /// Annotated frames are written here when set
    pub annotated_output_dir: Option<PathBuf>,
    pub max_batch_size: usize,
    pub simulate_latency: bool,
    pub max_sessions: usize,
    /// `[thresholds]` table, applied to the ONNX detectors
    pub thresholds: DetectorThresholds,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            debug: false,
            model_dir: PathBuf::from("./models/weights"),
            model_mode: DetectorMode::Hybrid,
            annotated_output_dir: None,
            max_batch_size: 10,
            simulate_latency: true,
            max_sessions: DEFAULT_MAX_SESSIONS,
            thresholds: DetectorThresholds::default(),
        }
    }
}

impl ServiceConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_batch_size == 0 {
            return Err(ConfigError::Invalid(
                "max_batch_size must be at least 1".to_string(),
            ));
        }
        if self.max_sessions == 0 {
            return Err(ConfigError::Invalid(
                "max_sessions must be at least 1".to_string(),
            ));
        }
        if let Some((name, value)) = self.thresholds.out_of_range() {
            return Err(ConfigError::Invalid(format!(
                "thresholds.{} must be between 0 and 1, got {}",
                name, value
            )));
        }
        self.socket_addr().map(|_| ())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("bad listen address {}:{}: {}", self.host, self.port, e)))
    }

    pub fn registry_config(&self) -> ModelRegistryConfig {
        ModelRegistryConfig {
            model_dir: self.model_dir.clone(),
            mode: self.model_mode,
            simulate_latency: self.simulate_latency,
            mock_seed: None,
            thresholds: self.thresholds,
        }
    }
}

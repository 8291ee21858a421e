// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use clap::builder::{BoolishValueParser, FalseyValueParser};
use clap::{ArgAction, Parser};
use std::path::PathBuf;

use crate::config::{ConfigError, ServiceConfig};
use crate::vision::DetectorMode;

/// Drowsiness Detection API server
#[derive(Parser, Debug, Default)]
#[command(name = "drowsiness-api")]
#[command(version)]
#[command(about = "HTTP API for driver drowsiness detection", long_about = None)]
pub struct Cli {
    /// TOML config file; flags and environment variables override it
    #[arg(long, env = "CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Listen address
    #[arg(long, env = "API_HOST")]
    pub host: Option<String>,

    /// Listen port
    #[arg(long, env = "API_PORT")]
    pub port: Option<u16>,

    /// Log at DEBUG level; `DEBUG=false`, `0`, `no` or `off` leave it off
    #[arg(long, env = "DEBUG", action = ArgAction::SetTrue, value_parser = FalseyValueParser::new())]
    pub debug: bool,

    /// Directory holding yolo.onnx / fasterrcnn.onnx
    #[arg(long, env = "MODEL_DIR")]
    pub model_dir: Option<PathBuf>,

    /// Model loading mode: mock, real or hybrid
    #[arg(long, env = "MODEL_MODE")]
    pub model_mode: Option<DetectorMode>,

    /// Write annotated frames to this directory
    #[arg(long, env = "ANNOTATED_OUTPUT_DIR")]
    pub annotated_output_dir: Option<PathBuf>,

    /// Maximum number of images per batch request
    #[arg(long, env = "MAX_BATCH_SIZE")]
    pub max_batch_size: Option<usize>,

    /// Sleep for the mock models' simulated inference time (true/false, yes/no, 1/0)
    #[arg(long, env = "SIMULATE_LATENCY", value_parser = BoolishValueParser::new())]
    pub simulate_latency: Option<bool>,

    /// Maximum number of tracked sessions
    #[arg(long, env = "MAX_SESSIONS")]
    pub max_sessions: Option<usize>,
}

impl Cli {
    /// Build the service config: file (or defaults), then flags and env
    pub fn load_config(&self) -> Result<ServiceConfig, ConfigError> {
        let base = match self.config_file {
            Some(ref path) => ServiceConfig::from_file(path)?,
            None => ServiceConfig::default(),
        };

        let config = self.apply(base);
        config.validate()?;
        Ok(config)
    }

    fn apply(&self, mut config: ServiceConfig) -> ServiceConfig {
        if let Some(ref host) = self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if self.debug {
            config.debug = true;
        }
        if let Some(ref dir) = self.model_dir {
            config.model_dir = dir.clone();
        }
        if let Some(mode) = self.model_mode {
            config.model_mode = mode;
        }
        if let Some(ref dir) = self.annotated_output_dir {
            config.annotated_output_dir = Some(dir.clone());
        }
        if let Some(size) = self.max_batch_size {
            config.max_batch_size = size;
        }
        if let Some(simulate) = self.simulate_latency {
            config.simulate_latency = simulate;
        }
        if let Some(max) = self.max_sessions {
            config.max_sessions = max;
        }
        config
    }
}

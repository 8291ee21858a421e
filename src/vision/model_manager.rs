// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Model registry: loads mock or ONNX detectors and hands them out by name

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use super::classes::{drowsy_classes, safe_classes};
use super::detector::{Backend, Detector, KNOWN_PROFILES};
use super::faster_rcnn::{FasterRcnnDetector, DEFAULT_SCORE_THRESHOLD, FASTER_RCNN_MODEL_FILE};
use super::mock::MockDetector;
use super::yolo::{
    YoloDetector, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_IOU_THRESHOLD, YOLO_MODEL_FILE,
};

/// How models are provided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorMode {
    /// Randomized mocks only
    Mock,
    /// ONNX models only; missing files leave the name unavailable
    Real,
    /// ONNX where the file exists, mock otherwise
    Hybrid,
}

impl DetectorMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorMode::Mock => "mock",
            DetectorMode::Real => "real",
            DetectorMode::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for DetectorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("Unknown detector mode '{0}' (expected mock, real or hybrid)")]
pub struct ParseModeError(String);

impl FromStr for DetectorMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mock" => Ok(DetectorMode::Mock),
            "real" => Ok(DetectorMode::Real),
            "hybrid" => Ok(DetectorMode::Hybrid),
            other => Err(ParseModeError(other.to_string())),
        }
    }
}

/// Post-processing thresholds of the ONNX detectors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorThresholds {
    /// Minimum class score for a YOLO box
    pub yolo_confidence: f32,
    /// IoU above which YOLO boxes of one class are merged
    pub yolo_iou: f32,
    /// Minimum Faster R-CNN score
    pub faster_rcnn_score: f32,
}

impl Default for DetectorThresholds {
    fn default() -> Self {
        Self {
            yolo_confidence: DEFAULT_CONFIDENCE_THRESHOLD,
            yolo_iou: DEFAULT_IOU_THRESHOLD,
            faster_rcnn_score: DEFAULT_SCORE_THRESHOLD,
        }
    }
}

impl DetectorThresholds {
    /// Name and value of the first threshold outside `[0, 1]`
    pub fn out_of_range(&self) -> Option<(&'static str, f32)> {
        [
            ("yolo_confidence", self.yolo_confidence),
            ("yolo_iou", self.yolo_iou),
            ("faster_rcnn_score", self.faster_rcnn_score),
        ]
        .into_iter()
        .find(|(_, value)| !(0.0..=1.0).contains(value))
    }
}

/// Configuration for loading the detection models
#[derive(Debug, Clone)]
pub struct ModelRegistryConfig {
    /// Directory holding `yolo.onnx` / `fasterrcnn.onnx`
    pub model_dir: PathBuf,
    pub mode: DetectorMode,
    /// Sleep for the mock's simulated inference time
    pub simulate_latency: bool,
    /// Fixed seed for the mock generators
    pub mock_seed: Option<u64>,
    pub thresholds: DetectorThresholds,
}

impl Default for ModelRegistryConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("./models/weights"),
            mode: DetectorMode::Hybrid,
            simulate_latency: true,
            mock_seed: None,
            thresholds: DetectorThresholds::default(),
        }
    }
}

/// Model description served by `/api/models`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub accuracy: f32,
    pub speed: String,
    pub memory_usage: String,
    pub is_available: bool,
    pub backend: Backend,
    /// "development" for mocks, "production" for real weights
    pub mode: String,
    pub supported_classes: Vec<String>,
    pub drowsy_classes: Vec<String>,
    pub safe_classes: Vec<String>,
    pub device: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    pub mode: DetectorMode,
    pub total_models: usize,
    pub mock_models: usize,
    pub onnx_models: usize,
}

/// Loaded detectors keyed by model name
pub struct ModelRegistry {
    mode: DetectorMode,
    models: HashMap<String, Arc<dyn Detector>>,
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("mode", &self.mode)
            .field("models", &self.loaded_models())
            .finish()
    }
}

impl ModelRegistry {
    /// Load models for the configured mode
    ///
    /// Load failures never abort startup: in real mode the name stays
    /// unavailable, in hybrid mode the mock takes its place.
    pub fn load(config: &ModelRegistryConfig) -> Self {
        let mut models: HashMap<String, Arc<dyn Detector>> = HashMap::new();

        for profile in KNOWN_PROFILES {
            let name = profile.name;

            let real = if config.mode == DetectorMode::Mock {
                None
            } else {
                load_onnx(name, config)
            };

            let detector = match (real, config.mode) {
                (Some(detector), _) => Some(detector),
                (None, DetectorMode::Real) => {
                    tracing::warn!("⚠️ Model {} not available in real mode", name);
                    None
                }
                (None, _) => mock_for(name, config),
            };

            if let Some(detector) = detector {
                tracing::info!(
                    "✅ Model {} ready ({:?} backend)",
                    name,
                    detector.backend()
                );
                models.insert(name.to_string(), detector);
            }
        }

        tracing::info!(
            "Loaded {} models in {} mode",
            models.len(),
            config.mode
        );

        Self {
            mode: config.mode,
            models,
        }
    }

    /// Registry over an explicit set of detectors
    pub fn from_detectors(mode: DetectorMode, detectors: Vec<Arc<dyn Detector>>) -> Self {
        let models = detectors
            .into_iter()
            .map(|d| (d.name().to_string(), d))
            .collect();
        Self { mode, models }
    }

    pub fn mode(&self) -> DetectorMode {
        self.mode
    }

    pub fn get_model(&self, name: &str) -> Option<Arc<dyn Detector>> {
        self.models.get(name).cloned()
    }

    pub fn is_model_loaded(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Names of loaded models in catalogue order
    pub fn loaded_models(&self) -> Vec<String> {
        let mut names: Vec<String> = KNOWN_PROFILES
            .iter()
            .filter(|p| self.models.contains_key(p.name))
            .map(|p| p.name.to_string())
            .collect();

        let mut extra: Vec<String> = self
            .models
            .keys()
            .filter(|k| !names.contains(*k))
            .cloned()
            .collect();
        extra.sort();
        names.extend(extra);
        names
    }

    /// Info for every model the API knows, loaded or not
    pub fn model_info(&self) -> Vec<ModelInfo> {
        KNOWN_PROFILES
            .iter()
            .filter_map(|p| self.model_info_for(p.name))
            .collect()
    }

    pub fn model_info_for(&self, name: &str) -> Option<ModelInfo> {
        if let Some(detector) = self.models.get(name) {
            let profile = detector.profile();
            let classes = detector.class_names();
            let backend = detector.backend();

            return Some(ModelInfo {
                name: profile.name.to_string(),
                display_name: profile.display_name.to_string(),
                description: profile.description.to_string(),
                accuracy: profile.accuracy,
                speed: profile.speed.to_string(),
                memory_usage: profile.memory_usage.to_string(),
                is_available: true,
                backend,
                mode: backend_mode(backend).to_string(),
                drowsy_classes: drowsy_classes(&classes),
                safe_classes: safe_classes(&classes),
                supported_classes: classes,
                device: "cpu".to_string(),
            });
        }

        KNOWN_PROFILES
            .iter()
            .find(|p| p.name == name)
            .map(|profile| ModelInfo {
                name: profile.name.to_string(),
                display_name: profile.display_name.to_string(),
                description: profile.description.to_string(),
                accuracy: profile.accuracy,
                speed: profile.speed.to_string(),
                memory_usage: profile.memory_usage.to_string(),
                is_available: false,
                backend: Backend::Onnx,
                mode: backend_mode(Backend::Onnx).to_string(),
                supported_classes: Vec::new(),
                drowsy_classes: Vec::new(),
                safe_classes: Vec::new(),
                device: "cpu".to_string(),
            })
    }

    pub fn stats(&self) -> RegistryStats {
        let onnx_models = self
            .models
            .values()
            .filter(|d| d.backend() == Backend::Onnx)
            .count();

        RegistryStats {
            mode: self.mode,
            total_models: self.models.len(),
            mock_models: self.models.len() - onnx_models,
            onnx_models,
        }
    }
}

fn backend_mode(backend: Backend) -> &'static str {
    match backend {
        Backend::Mock => "development",
        Backend::Onnx => "production",
    }
}

fn load_onnx(name: &str, config: &ModelRegistryConfig) -> Option<Arc<dyn Detector>> {
    let thresholds = config.thresholds;
    let result: anyhow::Result<Arc<dyn Detector>> = match name {
        "yolo" => YoloDetector::load(config.model_dir.join(YOLO_MODEL_FILE)).map(|d| {
            Arc::new(
                d.with_confidence_threshold(thresholds.yolo_confidence)
                    .with_iou_threshold(thresholds.yolo_iou),
            ) as Arc<dyn Detector>
        }),
        "faster_rcnn" => FasterRcnnDetector::load(config.model_dir.join(FASTER_RCNN_MODEL_FILE))
            .map(|d| {
                Arc::new(d.with_score_threshold(thresholds.faster_rcnn_score)) as Arc<dyn Detector>
            }),
        // No ONNX export for the classifier
        _ => return None,
    };

    match result {
        Ok(detector) => Some(detector),
        Err(e) => {
            tracing::warn!("⚠️ Failed to load ONNX model {}: {:#}", name, e);
            None
        }
    }
}

fn mock_for(name: &str, config: &ModelRegistryConfig) -> Option<Arc<dyn Detector>> {
    let mut mock = MockDetector::for_name(name)?.with_latency(config.simulate_latency);
    if let Some(seed) = config.mock_seed {
        mock = mock.with_seed(seed);
    }
    Some(Arc::new(mock))
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detector abstraction shared by mock and ONNX models

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::classes::{class_name_for_id, classify, AlertLevel, ClassCategory, SAFE_DRIVING_CLASS_ID};

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("Model not loaded: {0}")]
    NotLoaded(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Unexpected model output: {0}")]
    InvalidOutput(String),
}

impl From<ort::Error> for DetectorError {
    fn from(e: ort::Error) -> Self {
        DetectorError::Inference(e.to_string())
    }
}

/// Bounding box in original image pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Raw detection in corner coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub class_id: u32,
    pub class_name: String,
    pub confidence: f32,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl Detection {
    pub fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    /// Intersection over union with another detection
    pub fn iou(&self, other: &Detection) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        let intersection = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        let union = self.area() + other.area() - intersection;

        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

/// Outcome of running one frame through a model
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionOutcome {
    pub is_drowsy: bool,
    pub confidence: f32,
    pub bbox: Option<BoundingBox>,
    pub class_name: String,
    pub class_id: u32,
    pub category: ClassCategory,
    pub alert_level: AlertLevel,
}

impl DetectionOutcome {
    /// Build an outcome from a class name, deriving category and alert level
    pub fn from_class(
        class_name: impl Into<String>,
        class_id: u32,
        confidence: f32,
        bbox: Option<BoundingBox>,
    ) -> Self {
        let class_name = class_name.into();
        let (category, alert_level) = classify(&class_name);

        Self {
            is_drowsy: category.needs_attention(),
            confidence,
            bbox,
            class_name,
            class_id,
            category,
            alert_level,
        }
    }

    /// Safe default when nothing passed the confidence threshold
    pub fn no_detection() -> Self {
        Self::from_class(class_name_for_id(SAFE_DRIVING_CLASS_ID), SAFE_DRIVING_CLASS_ID, 0.0, None)
    }
}

/// Whether a model localizes (returns a box) or only classifies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Detector,
    Classifier,
}

/// Where a model's predictions come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Mock,
    Onnx,
}

/// Static description of a model architecture
#[derive(Debug, Clone, PartialEq)]
pub struct ModelProfile {
    pub name: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub accuracy: f32,
    pub speed: &'static str,
    pub memory_usage: &'static str,
}

pub const YOLO_PROFILE: ModelProfile = ModelProfile {
    name: "yolo",
    display_name: "YOLOv8 Object Detection",
    description: "Fast real-time object detection optimized for mobile devices",
    accuracy: 0.87,
    speed: "fast",
    memory_usage: "medium",
};

pub const FASTER_RCNN_PROFILE: ModelProfile = ModelProfile {
    name: "faster_rcnn",
    display_name: "Faster R-CNN",
    description: "High accuracy object detection with region proposals",
    accuracy: 0.91,
    speed: "slow",
    memory_usage: "high",
};

pub const VGG16_PROFILE: ModelProfile = ModelProfile {
    name: "vgg16",
    display_name: "VGG16 Classifier",
    description: "Deep CNN for binary drowsiness classification",
    accuracy: 0.83,
    speed: "medium",
    memory_usage: "low",
};

/// All architectures the API knows by name
pub const KNOWN_PROFILES: [&ModelProfile; 3] = [&YOLO_PROFILE, &FASTER_RCNN_PROFILE, &VGG16_PROFILE];

/// A model that turns a frame into a drowsiness outcome
///
/// `detect` is CPU-bound; callers on the async runtime run it in
/// `spawn_blocking`.
pub trait Detector: Send + Sync {
    fn profile(&self) -> &ModelProfile;

    fn kind(&self) -> ModelKind;

    fn backend(&self) -> Backend;

    /// Class names the model can report
    fn class_names(&self) -> Vec<String>;

    fn detect(&self, image: &DynamicImage) -> Result<DetectionOutcome, DetectorError>;

    fn name(&self) -> &'static str {
        self.profile().name
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Driver drowsiness detection on single frames
//!
//! This module provides:
//! - Image decoding and validation for uploaded frames
//! - Mock detectors with the statistical profile of each model
//! - YOLOv8 and Faster R-CNN detectors on ONNX Runtime (CPU)
//! - A registry that serves models by name in mock, real or hybrid mode

pub mod annotate;
pub mod classes;
pub mod detector;
pub mod faster_rcnn;
pub mod image_utils;
pub mod mock;
pub mod model_manager;
pub mod postprocessing;
pub mod preprocessing;
pub mod yolo;

pub use annotate::AnnotationStore;
pub use classes::{classify, AlertLevel, ClassCategory, DRIVER_CLASSES};
pub use detector::{
    Backend, BoundingBox, Detection, DetectionOutcome, Detector, DetectorError, ModelKind,
    ModelProfile,
};
pub use image_utils::{decode_base64_image, decode_image_bytes, detect_format, ImageError, ImageInfo};
pub use mock::MockDetector;
pub use model_manager::{
    DetectorMode, DetectorThresholds, ModelInfo, ModelRegistry, ModelRegistryConfig,
};

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLOv8 driver-state detector on ONNX Runtime
//!
//! The model is the Ultralytics export of the driver-monitoring network:
//! a 640x640 letterboxed RGB input and a single `[1, 4 + classes, boxes]`
//! output holding center-x, center-y, width, height and one score per class.

use anyhow::{Context, Result};
use image::{DynamicImage, GenericImageView};
use ndarray::ArrayViewD;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use super::classes::DRIVER_CLASSES;
use super::detector::{
    Backend, Detection, DetectionOutcome, Detector, DetectorError, ModelKind, ModelProfile,
    YOLO_PROFILE,
};
use super::postprocessing::{best_detection, nms, to_bounding_box};
use super::preprocessing::{letterbox, LetterboxInfo, YOLO_INPUT_SIZE};

/// File name of the exported model inside the model directory
pub const YOLO_MODEL_FILE: &str = "yolo.onnx";

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

/// Label files looked up next to the model, in order
const CLASS_NAME_FILES: [&str; 2] = ["yolo.names", "classes.txt"];

#[derive(Clone)]
pub struct YoloDetector {
    session: Arc<Mutex<Session>>,
    input_name: String,
    class_names: Vec<String>,
    confidence_threshold: f32,
    iou_threshold: f32,
    model_path: PathBuf,
}

impl std::fmt::Debug for YoloDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloDetector")
            .field("model_path", &self.model_path)
            .field("input_name", &self.input_name)
            .field("class_names", &self.class_names)
            .field("confidence_threshold", &self.confidence_threshold)
            .field("iou_threshold", &self.iou_threshold)
            .finish_non_exhaustive()
    }
}

impl YoloDetector {
    /// Load the model and its class names
    pub fn load<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("YOLO model not found: {}", model_path.display());
        }

        info!("Loading YOLO model from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .with_context(|| format!("Failed to load YOLO model from {}", model_path.display()))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        let class_names = load_class_names(model_path);
        debug!("YOLO input: {}, classes: {:?}", input_name, class_names);

        info!("YOLO model loaded ({} classes)", class_names.len());

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            class_names,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            model_path: model_path.to_path_buf(),
        })
    }

    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn with_iou_threshold(mut self, threshold: f32) -> Self {
        self.iou_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// All detections above the confidence threshold after NMS
    pub fn detect_all(&self, image: &DynamicImage) -> Result<Vec<Detection>, DetectorError> {
        let (tensor, info) = letterbox(image, YOLO_INPUT_SIZE);

        let mut session = self
            .session
            .lock()
            .map_err(|_| DetectorError::Inference("YOLO session lock poisoned".to_string()))?;

        let input_value = Value::from_array(tensor)?;
        let outputs = session.run(ort::inputs![&self.input_name => input_value])?;
        let output = outputs[0].try_extract_array::<f32>()?;

        debug!("YOLO output shape: {:?}", output.shape());

        let candidates = parse_output(
            output.view(),
            &self.class_names,
            self.confidence_threshold,
            &info,
        )?;

        Ok(nms(candidates, self.iou_threshold))
    }
}

impl Detector for YoloDetector {
    fn profile(&self) -> &ModelProfile {
        &YOLO_PROFILE
    }

    fn kind(&self) -> ModelKind {
        ModelKind::Detector
    }

    fn backend(&self) -> Backend {
        Backend::Onnx
    }

    fn class_names(&self) -> Vec<String> {
        self.class_names.clone()
    }

    fn detect(&self, image: &DynamicImage) -> Result<DetectionOutcome, DetectorError> {
        let detections = self.detect_all(image)?;
        let (width, height) = image.dimensions();

        let outcome = match best_detection(&detections) {
            Some(best) => DetectionOutcome::from_class(
                best.class_name.clone(),
                best.class_id,
                best.confidence,
                Some(to_bounding_box(best, width, height)),
            ),
            None => DetectionOutcome::no_detection(),
        };

        debug!(
            "YOLO: {} detections, best {} ({:.3})",
            detections.len(),
            outcome.class_name,
            outcome.confidence
        );

        Ok(outcome)
    }
}

/// Read class names from a label file next to the model
///
/// Falls back to the trained driver classes when no file is present.
pub fn load_class_names(model_path: &Path) -> Vec<String> {
    let dir = model_path.parent().unwrap_or_else(|| Path::new("."));

    for file in CLASS_NAME_FILES {
        let path = dir.join(file);
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                let names: Vec<String> = contents
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(String::from)
                    .collect();
                if !names.is_empty() {
                    return names;
                }
                warn!("Class file {} is empty", path.display());
            }
            Err(_) => continue,
        }
    }

    DRIVER_CLASSES.iter().map(|c| c.to_string()).collect()
}

/// Decode raw YOLO output into detections in original image coordinates
///
/// Accepts `[1, 4 + classes, boxes]` and the transposed `[1, boxes, 4 + classes]`.
pub fn parse_output(
    output: ArrayViewD<f32>,
    class_names: &[String],
    confidence_threshold: f32,
    info: &LetterboxInfo,
) -> Result<Vec<Detection>, DetectorError> {
    let shape = output.shape();
    if shape.len() != 3 || shape[0] != 1 {
        return Err(DetectorError::InvalidOutput(format!(
            "expected [1, C, N], got {:?}",
            shape
        )));
    }

    let channels_first = shape[1] <= shape[2];
    let (channels, num_boxes) = if channels_first {
        (shape[1], shape[2])
    } else {
        (shape[2], shape[1])
    };

    if channels < 5 {
        return Err(DetectorError::InvalidOutput(format!(
            "need at least 5 channels, got {}",
            channels
        )));
    }

    let value = |c: usize, b: usize| {
        if channels_first {
            output[[0, c, b]]
        } else {
            output[[0, b, c]]
        }
    };

    let num_classes = channels - 4;
    let mut detections = Vec::new();

    for b in 0..num_boxes {
        let (class_id, confidence) = (0..num_classes)
            .map(|c| (c, value(4 + c, b)))
            .fold((0, f32::MIN), |best, (c, score)| {
                if score > best.1 {
                    (c, score)
                } else {
                    best
                }
            });

        if confidence < confidence_threshold {
            continue;
        }

        let cx = value(0, b);
        let cy = value(1, b);
        let w = value(2, b);
        let h = value(3, b);

        let (x1, y1) = info.map_to_original(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = info.map_to_original(cx + w / 2.0, cy + h / 2.0);

        let class_name = class_names
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class_{}", class_id));

        detections.push(Detection {
            class_id: class_id as u32,
            class_name,
            confidence,
            x1,
            y1,
            x2,
            y2,
        });
    }

    Ok(detections)
}

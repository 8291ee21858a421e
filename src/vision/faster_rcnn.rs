// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Faster R-CNN driver-state detector on ONNX Runtime
//!
//! Expects the torchvision export: an 800x800 `[0, 1]` RGB input and three
//! outputs, `boxes [N, 4]` (x1, y1, x2, y2 in input pixels), `labels [N]`
//! and `scores [N]`.

use anyhow::{Context, Result};
use image::{DynamicImage, GenericImageView};
use ndarray::ArrayViewD;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::classes::{class_name_for_id, DRIVER_CLASSES, SAFE_DRIVING_CLASS_ID};
use super::detector::{
    Backend, Detection, DetectionOutcome, Detector, DetectorError, ModelKind, ModelProfile,
    FASTER_RCNN_PROFILE,
};
use super::postprocessing::{best_detection, to_bounding_box};
use super::preprocessing::{resize_to_tensor, FASTER_RCNN_INPUT_SIZE};

pub const FASTER_RCNN_MODEL_FILE: &str = "fasterrcnn.onnx";

pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.7;

#[derive(Clone)]
pub struct FasterRcnnDetector {
    session: Arc<Mutex<Session>>,
    input_name: String,
    score_threshold: f32,
    model_path: PathBuf,
}

impl std::fmt::Debug for FasterRcnnDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FasterRcnnDetector")
            .field("model_path", &self.model_path)
            .field("input_name", &self.input_name)
            .field("score_threshold", &self.score_threshold)
            .finish_non_exhaustive()
    }
}

impl FasterRcnnDetector {
    pub fn load<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Faster R-CNN model not found: {}", model_path.display());
        }

        info!("Loading Faster R-CNN model from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .with_context(|| {
                format!(
                    "Failed to load Faster R-CNN model from {}",
                    model_path.display()
                )
            })?;

        if session.outputs.len() < 3 {
            anyhow::bail!(
                "Faster R-CNN model must have boxes, labels and scores outputs, found {}",
                session.outputs.len()
            );
        }

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        info!("Faster R-CNN model loaded");

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            model_path: model_path.to_path_buf(),
        })
    }

    pub fn with_score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = threshold.clamp(0.0, 1.0);
        self
    }
}

impl Detector for FasterRcnnDetector {
    fn profile(&self) -> &ModelProfile {
        &FASTER_RCNN_PROFILE
    }

    fn kind(&self) -> ModelKind {
        ModelKind::Detector
    }

    fn backend(&self) -> Backend {
        Backend::Onnx
    }

    fn class_names(&self) -> Vec<String> {
        DRIVER_CLASSES.iter().map(|c| c.to_string()).collect()
    }

    fn detect(&self, image: &DynamicImage) -> Result<DetectionOutcome, DetectorError> {
        let (width, height) = image.dimensions();
        let tensor = resize_to_tensor(image, FASTER_RCNN_INPUT_SIZE, FASTER_RCNN_INPUT_SIZE);

        let mut session = self.session.lock().map_err(|_| {
            DetectorError::Inference("Faster R-CNN session lock poisoned".to_string())
        })?;

        let input_value = Value::from_array(tensor)?;
        let outputs = session.run(ort::inputs![&self.input_name => input_value])?;

        let boxes = outputs[0].try_extract_array::<f32>()?;
        let labels = outputs[1].try_extract_array::<i64>()?;
        let scores = outputs[2].try_extract_array::<f32>()?;

        let scale_x = width as f32 / FASTER_RCNN_INPUT_SIZE as f32;
        let scale_y = height as f32 / FASTER_RCNN_INPUT_SIZE as f32;

        let detections = parse_outputs(
            boxes.view(),
            labels.view(),
            scores.view(),
            self.score_threshold,
            (scale_x, scale_y),
        )?;

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
            "Faster R-CNN: {} detections above {:.2}, best {} ({:.3})",
            detections.len(),
            self.score_threshold,
            outcome.class_name,
            outcome.confidence
        );

        Ok(outcome)
    }
}

/// Decode the three Faster R-CNN outputs, scaling boxes back to the original image
pub fn parse_outputs(
    boxes: ArrayViewD<f32>,
    labels: ArrayViewD<i64>,
    scores: ArrayViewD<f32>,
    score_threshold: f32,
    (scale_x, scale_y): (f32, f32),
) -> Result<Vec<Detection>, DetectorError> {
    let count = scores.len();

    if labels.len() != count || boxes.len() != count * 4 {
        return Err(DetectorError::InvalidOutput(format!(
            "mismatched outputs: boxes {:?}, labels {:?}, scores {:?}",
            boxes.shape(),
            labels.shape(),
            scores.shape()
        )));
    }

    let boxes: Vec<f32> = boxes.iter().copied().collect();

    let detections = scores
        .iter()
        .zip(labels.iter())
        .enumerate()
        .filter(|(_, (score, _))| **score >= score_threshold)
        .map(|(i, (score, label))| {
            let class_id = label_to_class_id(*label);
            let b = &boxes[i * 4..i * 4 + 4];
            Detection {
                class_id,
                class_name: class_name_for_id(class_id).to_string(),
                confidence: *score,
                x1: b[0] * scale_x,
                y1: b[1] * scale_y,
                x2: b[2] * scale_x,
                y2: b[3] * scale_y,
            }
        })
        .collect();

    Ok(detections)
}

/// Labels outside the trained class table resolve to safe driving
fn label_to_class_id(label: i64) -> u32 {
    u32::try_from(label)
        .ok()
        .filter(|id| (*id as usize) < DRIVER_CLASSES.len())
        .unwrap_or(SAFE_DRIVING_CLASS_ID)
}

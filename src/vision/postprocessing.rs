// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection post-processing shared by the ONNX detectors

use std::cmp::Ordering;

use super::detector::{BoundingBox, Detection};

fn by_confidence_desc(a: &Detection, b: &Detection) -> Ordering {
    b.confidence
        .partial_cmp(&a.confidence)
        .unwrap_or(Ordering::Equal)
}

/// Per-class non-maximum suppression
///
/// Boxes of different classes never suppress each other. The result is sorted
/// by confidence, highest first.
pub fn nms(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(by_confidence_desc);

    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for candidate in detections {
        let suppressed = kept
            .iter()
            .any(|k| k.class_id == candidate.class_id && k.iou(&candidate) > iou_threshold);
        if !suppressed {
            kept.push(candidate);
        }
    }

    kept
}

/// Highest-confidence detection, if any
pub fn best_detection(detections: &[Detection]) -> Option<&Detection> {
    detections.iter().max_by(|a, b| {
        a.confidence
            .partial_cmp(&b.confidence)
            .unwrap_or(Ordering::Equal)
    })
}

/// Clamp a detection to the image and convert it to integer pixels
pub fn to_bounding_box(detection: &Detection, image_width: u32, image_height: u32) -> BoundingBox {
    let max_x = image_width as f32;
    let max_y = image_height as f32;

    let x1 = detection.x1.clamp(0.0, max_x).round() as i32;
    let y1 = detection.y1.clamp(0.0, max_y).round() as i32;
    let x2 = detection.x2.clamp(0.0, max_x).round() as i32;
    let y2 = detection.y2.clamp(0.0, max_y).round() as i32;

    BoundingBox {
        x: x1,
        y: y1,
        width: (x2 - x1).max(0),
        height: (y2 - y1).max(0),
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Writes detection frames with their bounding box drawn on them

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::classes::AlertLevel;
use super::detector::{BoundingBox, DetectionOutcome};

const BOX_THICKNESS: i32 = 3;

/// Box colour for an alert level
pub fn alert_color(level: AlertLevel) -> Rgb<u8> {
    match level {
        AlertLevel::None => Rgb([34, 139, 34]),
        AlertLevel::Medium => Rgb([255, 191, 0]),
        AlertLevel::High => Rgb([255, 110, 0]),
        AlertLevel::Critical => Rgb([220, 20, 60]),
    }
}

/// Directory of annotated frames, one JPEG per detection id
#[derive(Debug, Clone)]
pub struct AnnotationStore {
    dir: PathBuf,
}

impl AnnotationStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> std::io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Draw the outcome on the frame and write `<dir>/<detection_id>.jpg`
    ///
    /// Returns `None` when the file could not be written; the error is logged.
    pub fn save(
        &self,
        detection_id: &str,
        image: &DynamicImage,
        outcome: &DetectionOutcome,
    ) -> Option<PathBuf> {
        let mut rgb = image.to_rgb8();
        let color = alert_color(outcome.alert_level);

        match outcome.bbox {
            Some(bbox) => draw_box(&mut rgb, bbox, color),
            None => {
                // Classifier output: outline the whole frame
                let (w, h) = rgb.dimensions();
                let frame = BoundingBox {
                    x: 0,
                    y: 0,
                    width: w as i32,
                    height: h as i32,
                };
                draw_box(&mut rgb, frame, color);
            }
        }

        let path = self.dir.join(format!("{}.jpg", sanitize(detection_id)));
        match DynamicImage::ImageRgb8(rgb).save_with_format(&path, ImageFormat::Jpeg) {
            Ok(()) => {
                debug!("Annotated frame written to {}", path.display());
                Some(path)
            }
            Err(e) => {
                warn!("Failed to write annotated frame {}: {}", path.display(), e);
                None
            }
        }
    }
}

fn draw_box(image: &mut RgbImage, bbox: BoundingBox, color: Rgb<u8>) {
    for offset in 0..BOX_THICKNESS {
        let width = bbox.width - 2 * offset;
        let height = bbox.height - 2 * offset;
        if width <= 0 || height <= 0 {
            break;
        }
        let rect = Rect::at(bbox.x + offset, bbox.y + offset).of_size(width as u32, height as u32);
        draw_hollow_rect_mut(image, rect, color);
    }
}

fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

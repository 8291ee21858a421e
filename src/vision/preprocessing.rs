// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for the detection models

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use ndarray::Array4;

/// Input size of the YOLO detector
pub const YOLO_INPUT_SIZE: u32 = 640;

/// Input size the Faster R-CNN model was trained with
pub const FASTER_RCNN_INPUT_SIZE: u32 = 800;

/// Gray value used to pad letterboxed images
pub const LETTERBOX_PAD_VALUE: u8 = 114;

/// Geometry of a letterbox transform, used to map boxes back to the source image
#[derive(Debug, Clone, PartialEq)]
pub struct LetterboxInfo {
    /// Scale factor applied to the original image
    pub scale: f32,
    /// Horizontal padding on the left
    pub pad_x: u32,
    /// Vertical padding on the top
    pub pad_y: u32,
    pub original_width: u32,
    pub original_height: u32,
}

impl LetterboxInfo {
    pub fn new(original_width: u32, original_height: u32, target_size: u32) -> Self {
        if original_width == 0 || original_height == 0 {
            return Self {
                scale: 1.0,
                pad_x: 0,
                pad_y: 0,
                original_width,
                original_height,
            };
        }

        let scale = (target_size as f32 / original_width as f32)
            .min(target_size as f32 / original_height as f32);
        let (new_w, new_h) = scaled_dimensions(original_width, original_height, scale);

        Self {
            scale,
            pad_x: (target_size - new_w) / 2,
            pad_y: (target_size - new_h) / 2,
            original_width,
            original_height,
        }
    }

    /// Map a point from model input space back to the original image
    pub fn map_to_original(&self, x: f32, y: f32) -> (f32, f32) {
        let orig_x = (x - self.pad_x as f32) / self.scale;
        let orig_y = (y - self.pad_y as f32) / self.scale;
        (orig_x, orig_y)
    }
}

fn scaled_dimensions(width: u32, height: u32, scale: f32) -> (u32, u32) {
    let new_w = ((width as f32 * scale).round() as u32).max(1);
    let new_h = ((height as f32 * scale).round() as u32).max(1);
    (new_w, new_h)
}

/// Resize preserving aspect ratio, then pad to a gray square
pub fn letterbox_image(image: &DynamicImage, target_size: u32) -> (RgbImage, LetterboxInfo) {
    let (orig_w, orig_h) = image.dimensions();
    let info = LetterboxInfo::new(orig_w, orig_h, target_size);

    let mut output = RgbImage::from_pixel(
        target_size,
        target_size,
        Rgb([LETTERBOX_PAD_VALUE; 3]),
    );

    if orig_w == 0 || orig_h == 0 {
        return (output, info);
    }

    let (new_w, new_h) = scaled_dimensions(orig_w, orig_h, info.scale);
    let resized = image.resize_exact(new_w, new_h, FilterType::Triangle).to_rgb8();

    image::imageops::replace(&mut output, &resized, info.pad_x as i64, info.pad_y as i64);

    (output, info)
}

/// Letterbox an image and convert it to an NCHW tensor scaled to [0, 1]
pub fn letterbox(image: &DynamicImage, target_size: u32) -> (Array4<f32>, LetterboxInfo) {
    let (padded, info) = letterbox_image(image, target_size);
    (rgb_to_tensor(&padded), info)
}

/// Exact resize (no aspect preservation) to an NCHW tensor scaled to [0, 1]
pub fn resize_to_tensor(image: &DynamicImage, width: u32, height: u32) -> Array4<f32> {
    let resized = image
        .resize_exact(width, height, FilterType::Triangle)
        .to_rgb8();
    rgb_to_tensor(&resized)
}

fn rgb_to_tensor(rgb: &RgbImage) -> Array4<f32> {
    let (width, height) = rgb.dimensions();
    let mut tensor = Array4::zeros((1, 3, height as usize, width as usize));

    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }

    tensor
}

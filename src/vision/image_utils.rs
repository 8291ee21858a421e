// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image decoding and validation for camera frames

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage};
use thiserror::Error;
use tracing::{debug, warn};

/// Maximum decoded image size (10MB)
const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// Smallest frame we expect from a camera (width, height)
pub const MIN_IMAGE_SIZE: (u32, u32) = (64, 64);

/// Largest frame we expect from a camera (width, height)
pub const MAX_IMAGE_DIMENSIONS: (u32, u32) = (1920, 1080);

/// Formats accepted from clients
pub const SUPPORTED_FORMATS: &[ImageFormat] = &[ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::WebP];

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Image data is too large: {0} bytes (max: {1} bytes)")]
    TooLarge(usize, usize),

    #[error("Invalid base64 encoding: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Unsupported image format")]
    UnsupportedFormat,

    #[error("Failed to decode image: {0}")]
    DecodeFailed(String),

    #[error("Image data is empty")]
    EmptyData,
}

/// Image information extracted during loading
#[derive(Debug, Clone)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    pub size_bytes: usize,
}

/// Pixel statistics of a decoded frame
#[derive(Debug, Clone, PartialEq)]
pub struct ImageStats {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub mean_brightness: f64,
    pub min_value: u8,
    pub max_value: u8,
}

/// Decode a base64-encoded image, with or without a `data:` URL prefix
///
/// The returned image is always RGB8; transparent pixels are composited onto
/// white.
pub fn decode_base64_image(base64_str: &str) -> Result<(DynamicImage, ImageInfo), ImageError> {
    let payload = strip_data_url_prefix(base64_str).trim();
    if payload.is_empty() {
        return Err(ImageError::EmptyData);
    }

    let bytes = STANDARD.decode(payload)?;
    decode_image_bytes(&bytes)
}

/// Decode raw image bytes
pub fn decode_image_bytes(bytes: &[u8]) -> Result<(DynamicImage, ImageInfo), ImageError> {
    if bytes.len() > MAX_IMAGE_SIZE {
        return Err(ImageError::TooLarge(bytes.len(), MAX_IMAGE_SIZE));
    }

    if bytes.is_empty() {
        return Err(ImageError::EmptyData);
    }

    let format = detect_format(bytes)?;
    if !SUPPORTED_FORMATS.contains(&format) {
        warn!("Unsupported image format: {:?}", format);
        return Err(ImageError::UnsupportedFormat);
    }

    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| ImageError::DecodeFailed(e.to_string()))?;

    let (width, height) = img.dimensions();
    if width < MIN_IMAGE_SIZE.0
        || height < MIN_IMAGE_SIZE.1
        || width > MAX_IMAGE_DIMENSIONS.0
        || height > MAX_IMAGE_DIMENSIONS.1
    {
        warn!("Image size {}x{} outside valid range", width, height);
    }

    let info = ImageInfo {
        width,
        height,
        format,
        size_bytes: bytes.len(),
    };

    debug!("Decoded {:?} image {}x{}", format, width, height);

    Ok((flatten_to_rgb(img), info))
}

/// Drop everything up to and including the first `,` (data URL header)
fn strip_data_url_prefix(input: &str) -> &str {
    match input.split_once(',') {
        Some((_, payload)) => payload,
        None => input,
    }
}

/// Composite an image onto a white background and convert to RGB8
pub fn flatten_to_rgb(img: DynamicImage) -> DynamicImage {
    if !img.color().has_alpha() {
        return DynamicImage::ImageRgb8(img.to_rgb8());
    }

    let rgba = img.to_rgba8();
    let mut output = RgbImage::from_pixel(rgba.width(), rgba.height(), Rgb([255, 255, 255]));
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = pixel[3] as f32 / 255.0;
        let blended = [0, 1, 2].map(|c| {
            (pixel[c] as f32 * alpha + 255.0 * (1.0 - alpha)).round() as u8
        });
        output.put_pixel(x, y, Rgb(blended));
    }
    DynamicImage::ImageRgb8(output)
}

/// Detect image format from magic bytes
pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat, ImageError> {
    if bytes.len() < 4 {
        return Err(ImageError::UnsupportedFormat);
    }

    match bytes {
        // PNG: 89 50 4E 47
        [0x89, 0x50, 0x4E, 0x47, ..] => Ok(ImageFormat::Png),

        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Ok(ImageFormat::Jpeg),

        // WebP: RIFF .... WEBP
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Ok(ImageFormat::WebP),

        // GIF87a / GIF89a
        [0x47, 0x49, 0x46, 0x38, x, ..] if *x == 0x37 || *x == 0x39 => Ok(ImageFormat::Gif),

        [0x42, 0x4D, ..] => Ok(ImageFormat::Bmp),

        [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => Ok(ImageFormat::Tiff),

        _ => Err(ImageError::UnsupportedFormat),
    }
}

/// Check that a frame is usable for detection
///
/// Returns the reason as an error string when it is not.
pub fn validate_image(image: &DynamicImage) -> Result<(), String> {
    let (width, height) = image.dimensions();

    if width < MIN_IMAGE_SIZE.0 || height < MIN_IMAGE_SIZE.1 {
        return Err(format!(
            "Image too small: {}x{} (min: {}x{})",
            width, height, MIN_IMAGE_SIZE.0, MIN_IMAGE_SIZE.1
        ));
    }

    if width > MAX_IMAGE_DIMENSIONS.0 || height > MAX_IMAGE_DIMENSIONS.1 {
        return Err(format!(
            "Image too large: {}x{} (max: {}x{})",
            width, height, MAX_IMAGE_DIMENSIONS.0, MAX_IMAGE_DIMENSIONS.1
        ));
    }

    let rgb = image.to_rgb8();
    if rgb.as_raw().iter().all(|&v| v == 0) {
        return Err("Image is completely black".to_string());
    }
    if rgb.as_raw().iter().all(|&v| v == 255) {
        return Err("Image is completely white".to_string());
    }

    Ok(())
}

/// Compute pixel statistics over the RGB channels
pub fn image_stats(image: &DynamicImage) -> ImageStats {
    let rgb = image.to_rgb8();
    let raw = rgb.as_raw();

    let (min_value, max_value, sum) = raw.iter().fold((u8::MAX, u8::MIN, 0u64), |(min, max, sum), &v| {
        (min.min(v), max.max(v), sum + v as u64)
    });

    let mean_brightness = if raw.is_empty() {
        0.0
    } else {
        sum as f64 / raw.len() as f64
    };

    ImageStats {
        width: rgb.width(),
        height: rgb.height(),
        channels: 3,
        mean_brightness,
        min_value: if raw.is_empty() { 0 } else { min_value },
        max_value,
    }
}

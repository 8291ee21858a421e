// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Mock detectors for running the API without model weights
//!
//! Each mock reproduces the statistical profile of the real model it stands
//! in for: how often it reports a drowsy driver, the confidence range of each
//! answer, the size of the face box and how long inference takes.

use image::DynamicImage;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

use super::classes::{class_name_for_id, drowsy_classes, DRIVER_CLASSES, SAFE_DRIVING_CLASS_ID};
use super::detector::{
    Backend, BoundingBox, DetectionOutcome, Detector, DetectorError, ModelKind, ModelProfile,
    FASTER_RCNN_PROFILE, VGG16_PROFILE, YOLO_PROFILE,
};

/// Inclusive pixel ranges for a mock face box
#[derive(Debug, Clone, Copy)]
pub struct BoxRange {
    pub origin: (i32, i32),
    pub width: (i32, i32),
    pub height: (i32, i32),
}

/// Statistical behaviour of a mock model
#[derive(Debug, Clone, Copy)]
pub struct MockBehavior {
    pub drowsy_probability: f64,
    pub drowsy_confidence: (f32, f32),
    pub alert_confidence: (f32, f32),
    /// `None` for classifiers
    pub bbox: Option<BoxRange>,
    pub latency_secs: (f64, f64),
}

pub const YOLO_BEHAVIOR: MockBehavior = MockBehavior {
    drowsy_probability: 0.30,
    drowsy_confidence: (0.60, 0.95),
    alert_confidence: (0.10, 0.50),
    bbox: Some(BoxRange {
        origin: (50, 150),
        width: (100, 200),
        height: (120, 250),
    }),
    latency_secs: (0.1, 0.3),
};

pub const FASTER_RCNN_BEHAVIOR: MockBehavior = MockBehavior {
    drowsy_probability: 0.25,
    drowsy_confidence: (0.75, 0.98),
    alert_confidence: (0.05, 0.30),
    bbox: Some(BoxRange {
        origin: (40, 120),
        width: (120, 220),
        height: (140, 280),
    }),
    latency_secs: (0.5, 1.2),
};

pub const VGG16_BEHAVIOR: MockBehavior = MockBehavior {
    drowsy_probability: 0.35,
    drowsy_confidence: (0.50, 0.90),
    alert_confidence: (0.10, 0.60),
    bbox: None,
    latency_secs: (0.2, 0.6),
};

/// Randomized stand-in for a detection model
pub struct MockDetector {
    profile: &'static ModelProfile,
    behavior: MockBehavior,
    rng: Mutex<StdRng>,
    simulate_latency: bool,
}

impl std::fmt::Debug for MockDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockDetector")
            .field("name", &self.profile.name)
            .field("behavior", &self.behavior)
            .field("simulate_latency", &self.simulate_latency)
            .finish_non_exhaustive()
    }
}

impl MockDetector {
    pub fn new(profile: &'static ModelProfile, behavior: MockBehavior) -> Self {
        Self {
            profile,
            behavior,
            rng: Mutex::new(StdRng::from_entropy()),
            simulate_latency: true,
        }
    }

    pub fn yolo() -> Self {
        Self::new(&YOLO_PROFILE, YOLO_BEHAVIOR)
    }

    pub fn faster_rcnn() -> Self {
        Self::new(&FASTER_RCNN_PROFILE, FASTER_RCNN_BEHAVIOR)
    }

    pub fn vgg16() -> Self {
        Self::new(&VGG16_PROFILE, VGG16_BEHAVIOR)
    }

    /// Mock for a known model name
    pub fn for_name(name: &str) -> Option<Self> {
        match name {
            "yolo" => Some(Self::yolo()),
            "faster_rcnn" => Some(Self::faster_rcnn()),
            "vgg16" => Some(Self::vgg16()),
            _ => None,
        }
    }

    /// Seed the random generator for reproducible output
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Enable or disable the simulated inference delay
    pub fn with_latency(mut self, simulate_latency: bool) -> Self {
        self.simulate_latency = simulate_latency;
        self
    }

    pub fn behavior(&self) -> &MockBehavior {
        &self.behavior
    }

    fn sample(&self, rng: &mut StdRng) -> DetectionOutcome {
        let behavior = &self.behavior;
        let is_drowsy = rng.gen_bool(behavior.drowsy_probability);

        let (low, high) = if is_drowsy {
            behavior.drowsy_confidence
        } else {
            behavior.alert_confidence
        };
        let confidence = round3(rng.gen_range(low..=high));

        if !is_drowsy {
            return DetectionOutcome::from_class(
                class_name_for_id(SAFE_DRIVING_CLASS_ID),
                SAFE_DRIVING_CLASS_ID,
                confidence,
                None,
            );
        }

        let attention = drowsy_classes(&DRIVER_CLASSES);
        let class_name = attention
            .choose(rng)
            .cloned()
            .unwrap_or_else(|| "drowsy".to_string());
        let class_id = DRIVER_CLASSES
            .iter()
            .position(|c| *c == class_name)
            .unwrap_or(0) as u32;

        let bbox = behavior.bbox.map(|range| BoundingBox {
            x: rng.gen_range(range.origin.0..=range.origin.1),
            y: rng.gen_range(range.origin.0..=range.origin.1),
            width: rng.gen_range(range.width.0..=range.width.1),
            height: rng.gen_range(range.height.0..=range.height.1),
        });

        DetectionOutcome::from_class(class_name, class_id, confidence, bbox)
    }
}

fn round3(value: f32) -> f32 {
    (value * 1000.0).round() / 1000.0
}

impl Detector for MockDetector {
    fn profile(&self) -> &ModelProfile {
        self.profile
    }

    fn kind(&self) -> ModelKind {
        if self.behavior.bbox.is_some() {
            ModelKind::Detector
        } else {
            ModelKind::Classifier
        }
    }

    fn backend(&self) -> Backend {
        Backend::Mock
    }

    fn class_names(&self) -> Vec<String> {
        DRIVER_CLASSES.iter().map(|c| c.to_string()).collect()
    }

    fn detect(&self, _image: &DynamicImage) -> Result<DetectionOutcome, DetectorError> {
        let (outcome, delay) = {
            let mut rng = self
                .rng
                .lock()
                .map_err(|_| DetectorError::Inference("mock rng lock poisoned".to_string()))?;
            let outcome = self.sample(&mut rng);
            let (low, high) = self.behavior.latency_secs;
            (outcome, rng.gen_range(low..=high))
        };

        if self.simulate_latency {
            std::thread::sleep(Duration::from_secs_f64(delay));
        }

        debug!(
            "Mock {} -> {} ({:.3})",
            self.profile.name, outcome.class_name, outcome.confidence
        );

        Ok(outcome)
    }
}

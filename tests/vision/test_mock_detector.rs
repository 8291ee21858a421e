// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Mock detector behaviour over many frames

use drowsiness_detection_api::vision::{
    AlertLevel, ClassCategory, Detector, MockDetector, ModelKind,
};
use image::{DynamicImage, RgbImage};

fn frame() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::new(640, 480))
}

#[cfg(test)]
mod mock_detector_tests {
    use super::*;

    #[test]
    fn test_yolo_mock_statistics() {
        let detector = MockDetector::yolo().with_seed(1).with_latency(false);
        let image = frame();

        let mut drowsy = 0;
        for _ in 0..500 {
            let outcome = detector.detect(&image).unwrap();
            if outcome.is_drowsy {
                drowsy += 1;
                assert!((0.60..=0.95).contains(&outcome.confidence));
                assert!(outcome.bbox.is_some());
                assert_ne!(outcome.category, ClassCategory::Safe);
            } else {
                assert!((0.10..=0.50).contains(&outcome.confidence));
                assert!(outcome.bbox.is_none());
                assert_eq!(outcome.alert_level, AlertLevel::None);
            }
        }

        // 30% drowsy rate, with generous slack for a fixed seed
        assert!((100..=200).contains(&drowsy), "drowsy count {}", drowsy);
    }

    #[test]
    fn test_vgg16_is_a_classifier() {
        let detector = MockDetector::vgg16().with_seed(2).with_latency(false);
        assert_eq!(detector.kind(), ModelKind::Classifier);

        let image = frame();
        for _ in 0..100 {
            assert!(detector.detect(&image).unwrap().bbox.is_none());
        }
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let a = MockDetector::faster_rcnn().with_seed(99).with_latency(false);
        let b = MockDetector::faster_rcnn().with_seed(99).with_latency(false);
        let image = frame();

        for _ in 0..20 {
            assert_eq!(a.detect(&image).unwrap(), b.detect(&image).unwrap());
        }
    }

    #[test]
    fn test_for_name() {
        assert_eq!(MockDetector::for_name("yolo").unwrap().name(), "yolo");
        assert!(MockDetector::for_name("resnet").is_none());
    }
}

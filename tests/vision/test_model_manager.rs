// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Model registry tests
//!
//! These tests verify that the ModelRegistry correctly:
//! - Loads mocks, real weights or a mix depending on the mode
//! - Reports availability for every known model
//! - Never fails startup when weights are missing

use drowsiness_detection_api::vision::{
    Backend, DetectorMode, DetectorThresholds, ModelRegistry, ModelRegistryConfig,
};
use std::path::PathBuf;

fn config(mode: DetectorMode, model_dir: PathBuf) -> ModelRegistryConfig {
    ModelRegistryConfig {
        model_dir,
        mode,
        simulate_latency: false,
        mock_seed: Some(7),
        thresholds: DetectorThresholds::default(),
    }
}

#[cfg(test)]
mod model_registry_tests {
    use super::*;

    #[test]
    fn test_mock_mode_loads_all_models() {
        let registry = ModelRegistry::load(&config(DetectorMode::Mock, PathBuf::from("/nonexistent")));

        assert_eq!(registry.mode(), DetectorMode::Mock);
        assert_eq!(registry.loaded_models(), vec!["yolo", "faster_rcnn", "vgg16"]);

        let stats = registry.stats();
        assert_eq!(stats.total_models, 3);
        assert_eq!(stats.mock_models, 3);
        assert_eq!(stats.onnx_models, 0);
    }

    #[test]
    fn test_real_mode_without_weights_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::load(&config(DetectorMode::Real, dir.path().to_path_buf()));

        assert!(registry.loaded_models().is_empty());
        assert!(!registry.is_model_loaded("yolo"));

        let info = registry.model_info();
        assert_eq!(info.len(), 3, "unavailable models are still listed");
        assert!(info.iter().all(|m| !m.is_available));
    }

    #[test]
    fn test_hybrid_mode_falls_back_to_mocks() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::load(&config(DetectorMode::Hybrid, dir.path().to_path_buf()));

        assert_eq!(registry.loaded_models().len(), 3);
        for name in ["yolo", "faster_rcnn", "vgg16"] {
            let detector = registry.get_model(name).unwrap();
            assert_eq!(detector.backend(), Backend::Mock);
        }
    }

    #[test]
    fn test_corrupt_weights_fall_back_in_hybrid_mode() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("yolo.onnx"), b"not an onnx graph").unwrap();

        let registry = ModelRegistry::load(&config(DetectorMode::Hybrid, dir.path().to_path_buf()));

        let yolo = registry.model_info_for("yolo").unwrap();
        assert!(yolo.is_available);
        assert_eq!(yolo.backend, Backend::Mock);
        assert_eq!(yolo.mode, "development");
    }

    #[test]
    fn test_model_info_lists_classes() {
        let registry = ModelRegistry::load(&config(DetectorMode::Mock, PathBuf::from(".")));

        let info = registry.model_info_for("faster_rcnn").unwrap();
        assert_eq!(info.supported_classes.len(), 7);
        assert!(info.drowsy_classes.contains(&"sleepy-driving".to_string()));
        assert!(info.safe_classes.contains(&"safe-driving".to_string()));
        assert_eq!(info.device, "cpu");

        assert!(registry.model_info_for("resnet").is_none());
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Detection endpoint tests for POST /api/detect
//!
//! Run against the mock models of `AppState::new_for_test()`, so no weights
//! are needed.

use axum::{extract::State, Json};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use drowsiness_detection_api::{
    api::{detect_handler, http_server::AppState, ApiError, DetectRequest},
    vision::AnnotationStore,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

/// Helper: 64x64 gradient PNG, base64 encoded
fn test_frame_base64() -> String {
    let img = RgbImage::from_fn(64, 64, |x, y| Rgb([(x * 4) as u8, (y * 4) as u8, 128]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    STANDARD.encode(bytes)
}

fn request(image: Option<String>, model: &str) -> DetectRequest {
    DetectRequest {
        image,
        model: model.to_string(),
        session_id: None,
        confidence_threshold: None,
    }
}

#[cfg(test)]
mod detect_handler_tests {
    use super::*;

    #[tokio::test]
    async fn test_detect_with_each_mock_model() {
        let state = AppState::new_for_test();

        for model in ["yolo", "faster_rcnn", "vgg16"] {
            let result = detect_handler(
                State(state.clone()),
                Ok(Json(request(Some(test_frame_base64()), model))),
            )
            .await;

            let Json(response) = result.unwrap_or_else(|e| panic!("{} failed: {}", model, e));
            assert_eq!(response.status, "success");
            assert_eq!(response.model_used, model);
            assert!(response.id.starts_with(&format!("{}_", model)));
            assert!((0.0..=1.0).contains(&response.confidence));
            assert!(response.inference_time >= 0.0);
            assert_eq!(
                response.alert_triggered,
                response.is_drowsy && response.confidence > 0.7
            );
            if model == "vgg16" {
                assert!(response.bbox.is_none(), "classifier must not report a box");
            }
            if !response.is_drowsy {
                assert!(response.bbox.is_none());
            }
        }
    }

    #[tokio::test]
    async fn test_data_url_prefix_accepted() {
        let state = AppState::new_for_test();
        let image = format!("data:image/png;base64,{}", test_frame_base64());

        let result = detect_handler(State(state), Ok(Json(request(Some(image), "yolo")))).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_missing_image() {
        let state = AppState::new_for_test();

        let result = detect_handler(State(state), Ok(Json(request(None, "yolo")))).await;

        let err = result.unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err, ApiError::InvalidRequest("No image data provided".to_string()));
    }

    #[tokio::test]
    async fn test_unknown_model() {
        let state = AppState::new_for_test();

        let result = detect_handler(
            State(state),
            Ok(Json(request(Some(test_frame_base64()), "resnet"))),
        )
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.to_response().message, "Model resnet not available");
    }

    #[tokio::test]
    async fn test_invalid_image_data() {
        let state = AppState::new_for_test();

        for image in ["not base64 at all!!", "aGVsbG8gd29ybGQ="] {
            let result =
                detect_handler(State(state.clone()), Ok(Json(request(Some(image.to_string()), "yolo"))))
                    .await;

            let err = result.unwrap_err();
            assert_eq!(err.status_code(), 400);
            assert_eq!(err.to_response().message, "Invalid image data format");
        }
    }

    #[tokio::test]
    async fn test_threshold_out_of_range() {
        let state = AppState::new_for_test();
        let mut req = request(Some(test_frame_base64()), "yolo");
        req.confidence_threshold = Some(1.5);

        let err = detect_handler(State(state), Ok(Json(req))).await.unwrap_err();
        let body = err.to_response();
        assert_eq!(body.error_code.as_deref(), Some("VALIDATION_ERROR"));
        assert!(body.message.contains("confidenceThreshold"));
    }

    #[tokio::test]
    async fn test_threshold_of_one_suppresses_detections() {
        let state = AppState::new_for_test();

        for _ in 0..10 {
            let mut req = request(Some(test_frame_base64()), "yolo");
            req.confidence_threshold = Some(1.0);

            let Json(response) = detect_handler(State(state.clone()), Ok(Json(req)))
                .await
                .unwrap();
            assert!(!response.is_drowsy);
            assert!(!response.alert_triggered);
            assert!(response.bbox.is_none());
            assert_eq!(response.class_name, "safe-driving");
            assert_eq!(response.class_id, 4);
        }
    }

    #[tokio::test]
    async fn test_annotated_image_written() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new_for_test()
            .with_annotations(AnnotationStore::new(dir.path()).unwrap());

        let Json(response) = detect_handler(
            State(state),
            Ok(Json(request(Some(test_frame_base64()), "yolo"))),
        )
        .await
        .unwrap();

        let path = response.annotated_image.expect("annotation path");
        assert!(std::path::Path::new(&path).exists());
        assert!(path.ends_with(".jpg"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_detections_keep_their_annotations() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new_for_test()
            .with_annotations(AnnotationStore::new(dir.path()).unwrap());

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let state = state.clone();
                tokio::spawn(async move {
                    detect_handler(
                        State(state),
                        Ok(Json(request(Some(test_frame_base64()), "yolo"))),
                    )
                    .await
                    .unwrap()
                    .0
                })
            })
            .collect();

        let mut ids = std::collections::HashSet::new();
        let mut paths = std::collections::HashSet::new();
        for task in tasks {
            let response = task.await.unwrap();
            ids.insert(response.id);
            paths.insert(response.annotated_image.expect("annotation path"));
        }

        assert_eq!(ids.len(), 16);
        assert_eq!(paths.len(), 16);
        let files = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(files, 16);
    }

    #[tokio::test]
    async fn test_no_annotation_without_store() {
        let state = AppState::new_for_test();

        let Json(response) = detect_handler(
            State(state),
            Ok(Json(request(Some(test_frame_base64()), "yolo"))),
        )
        .await
        .unwrap();

        assert!(response.annotated_image.is_none());
    }
}

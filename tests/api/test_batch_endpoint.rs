// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Batch detection tests for POST /api/detect/batch

use axum::{extract::State, Json};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use drowsiness_detection_api::{
    api::{batch_detect_handler, http_server::AppState, ApiError, BatchDetectRequest, BatchItem},
    sessions::SessionSettings,
    vision::AnnotationStore,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

fn test_frame_base64() -> String {
    let img = RgbImage::from_pixel(64, 64, Rgb([90, 120, 150]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    STANDARD.encode(bytes)
}

fn batch(images: Option<Vec<String>>, model: &str) -> BatchDetectRequest {
    BatchDetectRequest {
        images,
        model: model.to_string(),
        session_id: None,
        confidence_threshold: None,
    }
}

#[cfg(test)]
mod batch_handler_tests {
    use super::*;

    #[tokio::test]
    async fn test_batch_of_valid_frames() {
        let state = AppState::new_for_test();
        let images = vec![test_frame_base64(); 3];

        let Json(response) = batch_detect_handler(State(state), Ok(Json(batch(Some(images), "yolo"))))
            .await
            .unwrap();

        assert_eq!(response.status, "success");
        assert_eq!(response.model_used, "yolo");
        assert_eq!(response.results.len(), 3);
        assert_eq!(response.summary.total_detections, 3);
        assert_eq!(response.summary.failed_detections, 0);
        assert!(response.summary.drowsy_detections <= 3);
        assert!((0.0..=1.0).contains(&response.summary.alert_rate));

        for (i, item) in response.results.iter().enumerate() {
            assert_eq!(item.index(), i);
            assert!(matches!(item, BatchItem::Detection { .. }));
        }
    }

    #[tokio::test]
    async fn test_bad_frame_becomes_error_entry() {
        let state = AppState::new_for_test();
        let images = vec![
            test_frame_base64(),
            "definitely not an image".to_string(),
            test_frame_base64(),
        ];

        let Json(response) = batch_detect_handler(State(state), Ok(Json(batch(Some(images), "vgg16"))))
            .await
            .unwrap();

        assert_eq!(response.results.len(), 3);
        assert_eq!(response.summary.total_detections, 2);
        assert_eq!(response.summary.failed_detections, 1);

        match &response.results[1] {
            BatchItem::Error {
                index,
                status,
                message,
                ..
            } => {
                assert_eq!(*index, 1);
                assert_eq!(status, "error");
                assert!(message.starts_with("Error processing image 1:"));
            }
            other => panic!("expected error entry, got {:?}", other),
        }

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["results"][1]["index"], 1);
        assert_eq!(json["results"][0]["modelUsed"], "vgg16");
        assert_eq!(json["summary"]["failedDetections"], 1);
    }

    #[tokio::test]
    async fn test_missing_images() {
        let state = AppState::new_for_test();

        let err = batch_detect_handler(State(state), Ok(Json(batch(None, "yolo"))))
            .await
            .unwrap_err();

        assert_eq!(err, ApiError::InvalidRequest("No images data provided".to_string()));
    }

    #[tokio::test]
    async fn test_batch_too_large() {
        let state = AppState::new_for_test().with_max_batch_size(2);
        let images = vec![test_frame_base64(); 3];

        let err = batch_detect_handler(State(state), Ok(Json(batch(Some(images), "yolo"))))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 400);
        assert_eq!(err.to_response().message, "Batch size too large (max 2 images)");
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let state = AppState::new_for_test();

        let Json(response) = batch_detect_handler(State(state), Ok(Json(batch(Some(vec![]), "yolo"))))
            .await
            .unwrap();

        assert!(response.results.is_empty());
        assert_eq!(response.summary.total_detections, 0);
        assert_eq!(response.summary.alert_rate, 0.0);
        assert_eq!(response.summary.average_confidence, 0.0);
    }

    #[tokio::test]
    async fn test_batch_unknown_model() {
        let state = AppState::new_for_test();

        let err = batch_detect_handler(
            State(state),
            Ok(Json(batch(Some(vec![test_frame_base64()]), "resnet"))),
        )
        .await
        .unwrap_err();

        assert_eq!(err, ApiError::ModelNotAvailable("resnet".to_string()));
    }

    #[tokio::test]
    async fn test_batch_counts_frames_towards_session() {
        let state = AppState::new_for_test();
        let session = state.sessions.start(SessionSettings::default()).await.unwrap();

        let mut request = batch(
            Some(vec![
                test_frame_base64(),
                "broken frame".to_string(),
                test_frame_base64(),
                test_frame_base64(),
            ]),
            "yolo",
        );
        request.session_id = Some(session.id.clone());

        let Json(response) = batch_detect_handler(State(state.clone()), Ok(Json(request)))
            .await
            .unwrap();

        assert_eq!(response.session_id.as_deref(), Some(session.id.as_str()));
        for item in &response.results {
            if let BatchItem::Detection { detection, .. } = item {
                assert_eq!(detection.session_id.as_deref(), Some(session.id.as_str()));
            }
        }

        let record = state.sessions.end(&session.id).await.unwrap();
        assert_eq!(record.summary.total_frames, 3, "failed frames are not counted");
        assert_eq!(
            record.summary.drowsy_frames as usize,
            response.summary.drowsy_detections
        );
    }

    #[tokio::test]
    async fn test_batch_writes_one_annotation_per_frame() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new_for_test()
            .with_annotations(AnnotationStore::new(dir.path()).unwrap());
        let images = vec![test_frame_base64(); 5];

        let Json(response) = batch_detect_handler(State(state), Ok(Json(batch(Some(images), "faster_rcnn"))))
            .await
            .unwrap();

        let mut paths = std::collections::HashSet::new();
        for item in &response.results {
            match item {
                BatchItem::Detection { detection, .. } => {
                    let path = detection.annotated_image.clone().expect("annotation path");
                    assert!(std::path::Path::new(&path).exists());
                    paths.insert(path);
                }
                other => panic!("unexpected error entry {:?}", other),
            }
        }
        assert_eq!(paths.len(), 5);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 5);
    }

    #[tokio::test]
    async fn test_batch_applies_confidence_threshold() {
        let state = AppState::new_for_test();
        let mut request = batch(Some(vec![test_frame_base64(); 6]), "vgg16");
        request.confidence_threshold = Some(1.0);

        let Json(response) = batch_detect_handler(State(state), Ok(Json(request)))
            .await
            .unwrap();

        assert_eq!(response.summary.total_detections, 6);
        assert_eq!(response.summary.drowsy_detections, 0);
        assert_eq!(response.summary.alert_rate, 0.0);
        for item in &response.results {
            let BatchItem::Detection { detection, .. } = item else {
                panic!("unexpected error entry {:?}", item);
            };
            assert!(!detection.is_drowsy);
            assert_eq!(detection.class_id, 4);
            assert_eq!(detection.confidence, 0.0);
        }
    }

    #[tokio::test]
    async fn test_batch_rejects_bad_threshold() {
        let state = AppState::new_for_test();
        let mut request = batch(Some(vec![test_frame_base64()]), "yolo");
        request.confidence_threshold = Some(-0.1);

        let err = batch_detect_handler(State(state), Ok(Json(request)))
            .await
            .unwrap_err();

        assert_eq!(err.to_response().error_code.as_deref(), Some("VALIDATION_ERROR"));
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Session lifecycle tests: start, detect within a session, end, history
//!
//! These go through the full router so body parsing and status codes are
//! covered too.

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use drowsiness_detection_api::{
    api::http_server::{create_app, AppState},
    sessions::SessionStore,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::{json, Value};
use std::io::Cursor;
use tower::util::ServiceExt;

fn test_frame_base64() -> String {
    let img = RgbImage::from_fn(64, 64, |x, _| Rgb([(x * 3) as u8, 80, 200]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    STANDARD.encode(bytes)
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = match body {
        Some(json) => Body::from(json.to_string()),
        None => Body::empty(),
    };
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn start_session(app: &Router) -> String {
    let (status, body) = call(app, Method::POST, "/api/session/start", None).await;
    assert_eq!(status, StatusCode::OK);
    body["sessionId"].as_str().unwrap().to_string()
}

#[cfg(test)]
mod session_endpoint_tests {
    use super::*;

    #[tokio::test]
    async fn test_start_with_empty_body_uses_defaults() {
        let app = create_app(AppState::new_for_test());

        let (status, body) = call(&app, Method::POST, "/api/session/start", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["action"], "started");
        assert!(body["sessionId"].as_str().unwrap().starts_with("session_"));
        assert_eq!(body["sessionData"]["settings"]["model"], "yolo");
        assert!(body["sessionData"]["startTime"].is_string());
    }

    #[tokio::test]
    async fn test_start_with_settings() {
        let app = create_app(AppState::new_for_test());

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/session/start",
            Some(json!({"settings": {"model": "vgg16", "confidenceThreshold": 0.6}})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sessionData"]["settings"]["model"], "vgg16");
    }

    #[tokio::test]
    async fn test_start_rejects_bad_json() {
        let app = create_app(AppState::new_for_test());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/session/start")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "Invalid JSON body");
    }

    #[tokio::test]
    async fn test_full_session_lifecycle() {
        let app = create_app(AppState::new_for_test());
        let session_id = start_session(&app).await;

        let mut drowsy = 0;
        for _ in 0..4 {
            let (status, body) = call(
                &app,
                Method::POST,
                "/api/detect",
                Some(json!({"image": test_frame_base64(), "sessionId": session_id})),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["sessionId"], session_id.as_str());
            if body["isDrowsy"] == true {
                drowsy += 1;
            }
        }

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/session/end",
            Some(json!({"sessionId": session_id})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["action"], "ended");
        assert_eq!(body["sessionData"]["summary"]["totalFrames"], 4);
        assert_eq!(body["sessionData"]["summary"]["drowsyFrames"], drowsy);
        assert!(body["sessionData"]["endTime"].is_string());

        let (status, body) = call(&app, Method::GET, "/api/session/history", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalSessions"], 1);
        assert_eq!(body["totalDrowsyDetections"], drowsy);
        assert_eq!(body["sessions"][0]["id"], session_id.as_str());
        assert_eq!(body["sessions"][0]["isActive"], false);
    }

    #[tokio::test]
    async fn test_end_errors() {
        let app = create_app(AppState::new_for_test());

        let (status, body) = call(&app, Method::POST, "/api/session/end", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/session/end",
            Some(json!({"sessionId": "session_0_deadbeef"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["errorCode"], "NOT_FOUND");

        let session_id = start_session(&app).await;
        let end = Some(json!({"sessionId": session_id}));
        let (status, _) = call(&app, Method::POST, "/api/session/end", end.clone()).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&app, Method::POST, "/api/session/end", end).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["errorCode"], "CONFLICT");
    }

    #[tokio::test]
    async fn test_session_capacity() {
        let mut state = AppState::new_for_test();
        state.sessions = std::sync::Arc::new(SessionStore::new(1));
        let app = create_app(state);

        start_session(&app).await;

        let (status, body) = call(&app, Method::POST, "/api/session/start", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["errorCode"], "SERVICE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_history_starts_empty() {
        let app = create_app(AppState::new_for_test());

        let (status, body) = call(&app, Method::GET, "/api/session/history", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalSessions"], 0);
        assert_eq!(body["sessions"], json!([]));
    }
}

mod common;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use common::app::{spawn_test_app, spawn_with_limits};
use common::fixtures::{squat_frames, ONE_SQUAT};
use common::http::{assert_json_error, assert_status_ok_json, send_json, wait_for_snapshot};
use rep_stream::config::LimitsConfig;

async fn create(app: &axum::Router, exercise: &str) -> (StatusCode, Value) {
    send_json(app, Method::POST, "/api/sessions", Some(json!({ "exercise": exercise }))).await
}

async fn create_id(app: &axum::Router, exercise: &str) -> String {
    let (status, body) = create(app, exercise).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["sessionId"].as_str().expect("session id").to_string()
}

#[tokio::test]
async fn it_creates_session_from_alias() {
    let app = spawn_test_app().await;
    let (status, body) = create(&app.app, "  Push-Ups ").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["exercise"], "push_up");

    let id = body["data"]["sessionId"].as_str().expect("id");
    let (status, body) = send_json(&app.app, Method::GET, &format!("/api/sessions/{id}"), None).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["exercise"], "push_up");
    assert_eq!(body["data"]["repCount"], 0);
}

#[tokio::test]
async fn it_rejects_unknown_exercise() {
    let app = spawn_test_app().await;
    let (status, body) = create(&app.app, "deadlift").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "UNKNOWN_EXERCISE");
}

#[tokio::test]
async fn it_rejects_malformed_body() {
    let app = spawn_test_app().await;
    let (status, body) =
        send_json(&app.app, Method::POST, "/api/sessions", Some(json!({ "kind": "squat" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "INVALID_REQUEST_BODY");
}

#[tokio::test]
async fn it_enforces_session_limit() {
    let app = spawn_with_limits(LimitsConfig {
        max_sessions: 1,
        ..LimitsConfig::default()
    })
    .await;
    create_id(&app.app, "squat").await;
    let (status, body) = create(&app.app, "lunge").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_json_error(&body, "SESSION_LIMIT");
}

#[tokio::test]
async fn it_unknown_session_is_404() {
    let app = spawn_test_app().await;
    let missing = uuid::Uuid::new_v4();
    let (status, body) =
        send_json(&app.app, Method::GET, &format!("/api/sessions/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_json_error(&body, "SESSION_NOT_FOUND");

    let (status, body) = send_json(&app.app, Method::GET, "/api/sessions/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_json_error(&body, "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn it_counts_a_squat_from_frames() {
    let app = spawn_test_app().await;
    let id = create_id(&app.app, "squat").await;

    let (status, body) = send_json(
        &app.app,
        Method::POST,
        &format!("/api/sessions/{id}/frames"),
        Some(json!({ "frames": squat_frames(&ONE_SQUAT, 0) })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["data"]["accepted"], ONE_SQUAT.len());
    assert_eq!(body["data"]["dropped"], 0);

    let snapshot = wait_for_snapshot(&app.app, &id, |s| s["repCount"] == 1).await;
    assert_eq!(snapshot["detectionQuality"], "excellent");
    assert_eq!(snapshot["poseState"], "extended");
    let min_angle = snapshot["lastMetrics"]["minAngle"].as_f64().expect("min angle");
    assert!((min_angle - 90.0).abs() < 1e-6);
    assert!(snapshot["lastRepQuality"].is_null());
}

#[tokio::test]
async fn it_rejects_oversized_batches() {
    let app = spawn_with_limits(LimitsConfig {
        max_frames_per_batch: 3,
        ..LimitsConfig::default()
    })
    .await;
    let id = create_id(&app.app, "squat").await;
    let (status, body) = send_json(
        &app.app,
        Method::POST,
        &format!("/api/sessions/{id}/frames"),
        Some(json!({ "frames": squat_frames(&ONE_SQUAT, 0) })),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_json_error(&body, "BATCH_TOO_LARGE");
}

#[tokio::test]
async fn it_malformed_frames_are_skipped_not_rejected() {
    let app = spawn_test_app().await;
    let id = create_id(&app.app, "squat").await;
    let frames = json!({ "frames": [
        { "timestampMs": 0, "keypoints": [] },
        { "timestampMs": 10, "keypoints": [{ "name": "left_knee", "x": 1.0, "y": 2.0, "score": 1.5 }] },
    ]});
    let (status, _) = send_json(
        &app.app,
        Method::POST,
        &format!("/api/sessions/{id}/frames"),
        Some(frames),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let snapshot = wait_for_snapshot(&app.app, &id, |s| s["framesSkipped"] == 2).await;
    assert_eq!(snapshot["framesAnalyzed"], 0);
    assert_eq!(snapshot["repCount"], 0);
}

#[tokio::test]
async fn it_switch_and_restart_reset_counters() {
    let app = spawn_test_app().await;
    let id = create_id(&app.app, "squat").await;
    send_json(
        &app.app,
        Method::POST,
        &format!("/api/sessions/{id}/frames"),
        Some(json!({ "frames": squat_frames(&ONE_SQUAT, 0) })),
    )
    .await;
    wait_for_snapshot(&app.app, &id, |s| s["repCount"] == 1).await;

    let (status, body) = send_json(
        &app.app,
        Method::POST,
        &format!("/api/sessions/{id}/restart"),
        None,
    )
    .await;
    assert_status_ok_json(status, &body);
    let snapshot = wait_for_snapshot(&app.app, &id, |s| s["repCount"] == 0).await;
    assert!(snapshot["lastMetrics"].is_null());
    assert_eq!(snapshot["exercise"], "squat");

    let (status, body) = send_json(
        &app.app,
        Method::PUT,
        &format!("/api/sessions/{id}/exercise"),
        Some(json!({ "exercise": "ombro" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "UNKNOWN_EXERCISE");

    let (status, body) = send_json(
        &app.app,
        Method::PUT,
        &format!("/api/sessions/{id}/exercise"),
        Some(json!({ "exercise": "Rosca Direta" })),
    )
    .await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["exercise"], "bicep_curl");
    wait_for_snapshot(&app.app, &id, |s| s["exercise"] == "bicep_curl").await;
}

#[tokio::test]
async fn it_delete_returns_summary_and_forgets_session() {
    let app = spawn_test_app().await;
    let id = create_id(&app.app, "squat").await;
    send_json(
        &app.app,
        Method::POST,
        &format!("/api/sessions/{id}/frames"),
        Some(json!({ "frames": squat_frames(&ONE_SQUAT, 0) })),
    )
    .await;

    let (status, body) =
        send_json(&app.app, Method::DELETE, &format!("/api/sessions/{id}"), None).await;
    assert_status_ok_json(status, &body);
    let summary = &body["data"];
    assert_eq!(summary["sessionId"], id.as_str());
    // Stop is queued behind the frames, so every frame is processed first
    assert_eq!(summary["sets"][0]["exercise"], "squat");
    assert_eq!(summary["sets"][0]["repCount"], 1);
    assert_eq!(summary["sets"][0]["reps"][0]["index"], 1);

    let (status, _) = send_json(&app.app, Method::GET, &format!("/api/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) =
        send_json(&app.app, Method::DELETE, &format!("/api/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

mod common;

use axum::http::{Method, StatusCode};

use common::app::spawn_test_app;
use common::http::{assert_status_ok_json, send_json};

#[tokio::test]
async fn it_lists_the_catalog() {
    let app = spawn_test_app().await;
    let (status, body) = send_json(&app.app, Method::GET, "/api/exercises", None).await;
    assert_status_ok_json(status, &body);
    assert_eq!(status, StatusCode::OK);

    let catalog = body["data"].as_array().expect("array");
    let kinds: Vec<&str> = catalog.iter().filter_map(|e| e["kind"].as_str()).collect();
    assert_eq!(kinds, vec!["squat", "lunge", "push_up", "bicep_curl", "shoulder_press"]);

    let squat = &catalog[0];
    assert_eq!(squat["downThresholdDeg"], 100.0);
    assert_eq!(squat["upThresholdDeg"], 160.0);
    assert_eq!(squat["sideMode"], "bilateral");
    assert_eq!(squat["graded"], false);
    assert!(squat["aliases"]
        .as_array()
        .expect("aliases")
        .iter()
        .any(|a| a == "agachamento"));

    let curl = &catalog[3];
    assert_eq!(curl["sideMode"], "bestSide");
    assert_eq!(curl["graded"], true);
    assert!(curl["requiredJoints"]
        .as_array()
        .expect("joints")
        .iter()
        .any(|j| j == "left_elbow"));
}

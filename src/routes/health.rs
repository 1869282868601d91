use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health_check))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
}

pub async fn health_check(State(state): State<AppState>) -> impl axum::response::IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "uptimeSecs": state.uptime_secs(),
        "sessions": {
            "active": state.sessions().len().await,
            "max": state.config().limits.max_sessions,
        },
        "exercises": state.detector().exercises.len(),
    }))
}

pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// Not ready once every session slot is taken.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.sessions().len().await < state.config().limits.max_sessions {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::exercise::ExerciseKind;
use crate::analysis::types::Frame;
use crate::extractors::{JsonBody, SessionId};
use crate::response::{accepted, created, ok, AppError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExerciseRequest {
    exercise: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FramesRequest {
    frames: Vec<Frame>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionCreated {
    session_id: Uuid,
    exercise: ExerciseKind,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FramesAccepted {
    accepted: usize,
    dropped: usize,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_session))
        .route("/:id", get(get_session).delete(end_session))
        .route("/:id/exercise", put(select_exercise))
        .route("/:id/restart", post(restart_session))
        .route("/:id/frames", post(push_frames))
}

async fn create_session(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ExerciseRequest>,
) -> Result<impl IntoResponse, AppError> {
    let kind = req.exercise.parse::<ExerciseKind>()?;
    let handle = state.sessions().create(kind).await?;
    Ok(created(SessionCreated {
        session_id: handle.id(),
        exercise: kind,
    }))
}

async fn get_session(
    State(state): State<AppState>,
    SessionId(id): SessionId,
) -> Result<impl IntoResponse, AppError> {
    let handle = state.sessions().get(id).await?;
    Ok(ok(handle.snapshot()))
}

async fn select_exercise(
    State(state): State<AppState>,
    SessionId(id): SessionId,
    JsonBody(req): JsonBody<ExerciseRequest>,
) -> Result<impl IntoResponse, AppError> {
    let kind = req.exercise.parse::<ExerciseKind>()?;
    let handle = state.sessions().get(id).await?;
    handle.select(kind).await?;
    Ok(ok(SessionCreated {
        session_id: id,
        exercise: kind,
    }))
}

async fn restart_session(
    State(state): State<AppState>,
    SessionId(id): SessionId,
) -> Result<impl IntoResponse, AppError> {
    let handle = state.sessions().get(id).await?;
    handle.restart().await?;
    Ok(ok(serde_json::json!({ "sessionId": id, "restarted": true })))
}

async fn push_frames(
    State(state): State<AppState>,
    SessionId(id): SessionId,
    JsonBody(req): JsonBody<FramesRequest>,
) -> Result<impl IntoResponse, AppError> {
    let max = state.config().limits.max_frames_per_batch;
    if req.frames.len() > max {
        return Err(AppError::payload_too_large(
            "BATCH_TOO_LARGE",
            &format!("at most {max} frames per request"),
        ));
    }
    let handle = state.sessions().get(id).await?;
    let report = handle.offer_frames(req.frames)?;
    Ok(accepted(FramesAccepted {
        accepted: report.accepted,
        dropped: report.dropped,
    }))
}

async fn end_session(
    State(state): State<AppState>,
    SessionId(id): SessionId,
) -> Result<impl IntoResponse, AppError> {
    let summary = state.sessions().finish(id).await?;
    Ok(ok(summary))
}

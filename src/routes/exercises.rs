use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde::Serialize;

use crate::analysis::config::{ExerciseConfig, SideMode};
use crate::analysis::exercise::ExerciseKind;
use crate::analysis::types::JointName;
use crate::response::ok;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExerciseInfo {
    kind: ExerciseKind,
    aliases: &'static [&'static str],
    required_joints: Vec<JointName>,
    side_mode: SideMode,
    down_threshold_deg: f64,
    up_threshold_deg: f64,
    graded: bool,
    positioning_instructions: String,
}

impl ExerciseInfo {
    fn new(kind: ExerciseKind, config: ExerciseConfig) -> Self {
        Self {
            kind,
            aliases: kind.aliases(),
            side_mode: config.primary_angle.mode,
            down_threshold_deg: config.down_threshold_deg,
            up_threshold_deg: config.up_threshold_deg,
            graded: config.stability.is_some(),
            required_joints: config.required_joints,
            positioning_instructions: config.positioning_instructions,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_exercises))
}

async fn list_exercises(State(state): State<AppState>) -> impl IntoResponse {
    let catalog: Vec<ExerciseInfo> = ExerciseKind::ALL
        .iter()
        .map(|kind| ExerciseInfo::new(*kind, state.detector().exercise(*kind)))
        .collect();
    ok(catalog)
}

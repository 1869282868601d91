//! Supported exercise kinds and the alias table that maps user-facing
//! (localised or alternate) names onto them.
//!
//! Resolution happens once, at the dispatcher boundary. Nothing below the
//! dispatcher ever compares exercise strings.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
    Squat,
    Lunge,
    PushUp,
    BicepCurl,
    ShoulderPress,
}

impl ExerciseKind {
    pub const ALL: [ExerciseKind; 5] = [
        ExerciseKind::Squat,
        ExerciseKind::Lunge,
        ExerciseKind::PushUp,
        ExerciseKind::BicepCurl,
        ExerciseKind::ShoulderPress,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseKind::Squat => "squat",
            ExerciseKind::Lunge => "lunge",
            ExerciseKind::PushUp => "push_up",
            ExerciseKind::BicepCurl => "bicep_curl",
            ExerciseKind::ShoulderPress => "shoulder_press",
        }
    }

    /// Accepted alternate spellings, canonical name excluded.
    pub fn aliases(&self) -> &'static [&'static str] {
        ALIAS_TABLE
            .iter()
            .find(|(kind, _)| kind == self)
            .map(|(_, names)| *names)
            .unwrap_or(&[])
    }
}

impl fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown exercise: {0}")]
pub struct UnknownExercise(pub String);

impl FromStr for ExerciseKind {
    type Err = UnknownExercise;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        resolve(s).ok_or_else(|| UnknownExercise(s.trim().to_string()))
    }
}

const ALIAS_TABLE: &[(ExerciseKind, &[&str])] = &[
    (
        ExerciseKind::Squat,
        &["squats", "bodyweight squat", "agachamento", "agachamentos", "sentadilla", "sentadillas", "深蹲"],
    ),
    (
        ExerciseKind::Lunge,
        &["lunges", "forward lunge", "afundo", "avanço", "avanco", "zancada", "zancadas", "弓步"],
    ),
    (
        ExerciseKind::PushUp,
        &["push-up", "push-ups", "pushup", "pushups", "press up", "flexão", "flexao", "flexões", "flexoes", "flexión", "flexiones", "俯卧撑"],
    ),
    (
        ExerciseKind::BicepCurl,
        &["curl", "curls", "bicep curls", "biceps curl", "dumbbell curl", "rosca direta", "rosca bíceps", "rosca biceps", "curl de bíceps", "curl de biceps", "二头弯举"],
    ),
    (
        ExerciseKind::ShoulderPress,
        &["overhead press", "military press", "desenvolvimento", "desenvolvimento de ombros", "press de hombros", "press militar", "肩上推举"],
    ),
];

/// Lowercases and drops whitespace, `-` and `_` so that "Push-Up",
/// "push up" and "pushup" share one key.
fn normalize(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .collect()
}

static ALIASES: Lazy<HashMap<String, ExerciseKind>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for (kind, names) in ALIAS_TABLE {
        map.insert(normalize(kind.as_str()), *kind);
        for name in *names {
            map.insert(normalize(name), *kind);
        }
    }
    map
});

pub fn resolve(name: &str) -> Option<ExerciseKind> {
    let key = normalize(name);
    if key.is_empty() {
        return None;
    }
    ALIASES.get(&key).copied()
}

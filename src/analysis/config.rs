use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::exercise::ExerciseKind;
use crate::analysis::types::JointName;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read exercise config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse exercise config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid exercise config: {0}")]
    Invalid(String),
}

/// Three joints whose middle one is the vertex of the measured angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JointTriple {
    pub proximal: JointName,
    pub vertex: JointName,
    pub distal: JointName,
}

impl JointTriple {
    pub const fn new(proximal: JointName, vertex: JointName, distal: JointName) -> Self {
        Self {
            proximal,
            vertex,
            distal,
        }
    }

    pub fn joints(&self) -> [JointName; 3] {
        [self.proximal, self.vertex, self.distal]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SideMode {
    /// Mean of both sides when both are clearly visible.
    Bilateral,
    /// Whichever single side is seen best.
    BestSide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryAngle {
    pub left: JointTriple,
    pub right: JointTriple,
    pub mode: SideMode,
}

const LEFT_KNEE: JointTriple =
    JointTriple::new(JointName::LeftHip, JointName::LeftKnee, JointName::LeftAnkle);
const RIGHT_KNEE: JointTriple =
    JointTriple::new(JointName::RightHip, JointName::RightKnee, JointName::RightAnkle);
const LEFT_ELBOW: JointTriple =
    JointTriple::new(JointName::LeftShoulder, JointName::LeftElbow, JointName::LeftWrist);
const RIGHT_ELBOW: JointTriple =
    JointTriple::new(JointName::RightShoulder, JointName::RightElbow, JointName::RightWrist);

/// Form grading for isolation movements: the vertex of the measured side is
/// the pivot whose horizontal drift is checked while flexed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StabilityGrading {
    /// Allowed horizontal pivot displacement, in source image units.
    pub tolerance_px: f64,
    pub good_depth_deg: f64,
    pub average_depth_deg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseConfig {
    pub required_joints: Vec<JointName>,
    pub primary_angle: PrimaryAngle,
    pub down_threshold_deg: f64,
    pub up_threshold_deg: f64,
    pub min_visibility_score: f64,
    /// Stricter cutoff both sides must clear before they are averaged.
    #[serde(default = "default_bilateral_visibility_score")]
    pub bilateral_visibility_score: f64,
    #[serde(default)]
    pub stability: Option<StabilityGrading>,
    #[serde(default)]
    pub positioning_instructions: String,
}

fn default_bilateral_visibility_score() -> f64 {
    0.5
}

impl ExerciseConfig {
    pub fn for_kind(kind: ExerciseKind) -> Self {
        let legs = vec![
            JointName::LeftHip,
            JointName::RightHip,
            JointName::LeftKnee,
            JointName::RightKnee,
            JointName::LeftAnkle,
            JointName::RightAnkle,
        ];
        let arms = vec![
            JointName::LeftShoulder,
            JointName::RightShoulder,
            JointName::LeftElbow,
            JointName::RightElbow,
            JointName::LeftWrist,
            JointName::RightWrist,
        ];
        let knees = PrimaryAngle {
            left: LEFT_KNEE,
            right: RIGHT_KNEE,
            mode: SideMode::Bilateral,
        };
        let elbows = PrimaryAngle {
            left: LEFT_ELBOW,
            right: RIGHT_ELBOW,
            mode: SideMode::Bilateral,
        };

        match kind {
            ExerciseKind::Squat => Self {
                required_joints: legs,
                primary_angle: knees,
                down_threshold_deg: 100.0,
                up_threshold_deg: 160.0,
                min_visibility_score: 0.3,
                bilateral_visibility_score: 0.5,
                stability: None,
                positioning_instructions: "Stand facing the camera with your whole body in frame, \
                    feet shoulder-width apart."
                    .to_string(),
            },
            ExerciseKind::Lunge => Self {
                required_joints: legs,
                primary_angle: knees,
                down_threshold_deg: 105.0,
                up_threshold_deg: 160.0,
                min_visibility_score: 0.3,
                bilateral_visibility_score: 0.5,
                stability: None,
                positioning_instructions: "Turn slightly sideways so both legs stay visible \
                    from hips to ankles."
                    .to_string(),
            },
            ExerciseKind::PushUp => Self {
                required_joints: arms,
                primary_angle: elbows,
                down_threshold_deg: 90.0,
                up_threshold_deg: 150.0,
                min_visibility_score: 0.3,
                bilateral_visibility_score: 0.5,
                stability: None,
                positioning_instructions: "Place the camera at floor level, side-on, so your \
                    shoulders, elbows and wrists are visible."
                    .to_string(),
            },
            ExerciseKind::BicepCurl => Self {
                required_joints: arms,
                primary_angle: PrimaryAngle {
                    left: LEFT_ELBOW,
                    right: RIGHT_ELBOW,
                    mode: SideMode::BestSide,
                },
                down_threshold_deg: 65.0,
                up_threshold_deg: 150.0,
                min_visibility_score: 0.3,
                bilateral_visibility_score: 0.5,
                stability: Some(StabilityGrading {
                    tolerance_px: 15.0,
                    good_depth_deg: 45.0,
                    average_depth_deg: 55.0,
                }),
                positioning_instructions: "Stand side-on with the working arm closest to the \
                    camera and keep your elbow next to your body."
                    .to_string(),
            },
            ExerciseKind::ShoulderPress => Self {
                required_joints: arms,
                primary_angle: elbows,
                down_threshold_deg: 95.0,
                up_threshold_deg: 160.0,
                min_visibility_score: 0.3,
                bilateral_visibility_score: 0.5,
                stability: None,
                positioning_instructions: "Face the camera with both arms in frame, including \
                    your hands when fully extended overhead."
                    .to_string(),
            },
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.required_joints.is_empty() {
            return Err("requiredJoints must not be empty".to_string());
        }
        if !(0.0..=180.0).contains(&self.down_threshold_deg)
            || !(0.0..=180.0).contains(&self.up_threshold_deg)
        {
            return Err("angle thresholds must be in [0,180]".to_string());
        }
        if self.down_threshold_deg >= self.up_threshold_deg {
            return Err("downThresholdDeg must be < upThresholdDeg".to_string());
        }
        if !(0.0..=1.0).contains(&self.min_visibility_score) {
            return Err("minVisibilityScore must be in [0,1]".to_string());
        }
        if !(0.0..=1.0).contains(&self.bilateral_visibility_score) {
            return Err("bilateralVisibilityScore must be in [0,1]".to_string());
        }
        if self.bilateral_visibility_score < self.min_visibility_score {
            return Err("bilateralVisibilityScore must be >= minVisibilityScore".to_string());
        }
        if let Some(stability) = &self.stability {
            if !stability.tolerance_px.is_finite() || stability.tolerance_px < 0.0 {
                return Err("stability.tolerancePx must be >= 0".to_string());
            }
            if stability.good_depth_deg > stability.average_depth_deg {
                return Err("stability.goodDepthDeg must be <= averageDepthDeg".to_string());
            }
        }
        Ok(())
    }
}

/// Tunables shared by every analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisConfig {
    /// Debounce window after a counted repetition.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Minimum gap between two guidance messages.
    #[serde(default = "default_guidance_interval_ms")]
    pub guidance_interval_ms: u64,
    /// Positive guidance is offered once per this many consecutive usable frames.
    #[serde(default = "default_good_frame_guidance_every")]
    pub good_frame_guidance_every: u32,
    /// Consecutive below-threshold frames needed to enter the flexed state.
    #[serde(default = "default_entry_confirm_frames")]
    pub entry_confirm_frames: u32,
    #[serde(default = "default_max_buffered_samples")]
    pub max_buffered_samples: usize,
    #[serde(default = "default_poor_below")]
    pub poor_below: f64,
    #[serde(default = "default_excellent_above")]
    pub excellent_above: f64,
}

fn default_debounce_ms() -> u64 {
    400
}
fn default_guidance_interval_ms() -> u64 {
    1500
}
fn default_good_frame_guidance_every() -> u32 {
    30
}
fn default_entry_confirm_frames() -> u32 {
    1
}
fn default_max_buffered_samples() -> usize {
    1024
}
fn default_poor_below() -> f64 {
    0.5
}
fn default_excellent_above() -> f64 {
    0.8
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            guidance_interval_ms: default_guidance_interval_ms(),
            good_frame_guidance_every: default_good_frame_guidance_every(),
            entry_confirm_frames: default_entry_confirm_frames(),
            max_buffered_samples: default_max_buffered_samples(),
            poor_below: default_poor_below(),
            excellent_above: default_excellent_above(),
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=5000).contains(&self.debounce_ms) {
            return Err("debounceMs must be in [1,5000]".to_string());
        }
        if self.good_frame_guidance_every == 0 {
            return Err("goodFrameGuidanceEvery must be > 0".to_string());
        }
        if self.entry_confirm_frames == 0 {
            return Err("entryConfirmFrames must be > 0".to_string());
        }
        if self.max_buffered_samples < 2 {
            return Err("maxBufferedSamples must be >= 2".to_string());
        }
        if !(0.0..=1.0).contains(&self.poor_below) || !(0.0..=1.0).contains(&self.excellent_above) {
            return Err("quality tier boundaries must be in [0,1]".to_string());
        }
        if self.poor_below > self.excellent_above {
            return Err("poorBelow must be <= excellentAbove".to_string());
        }
        Ok(())
    }
}

/// Everything the detector needs: tunables plus one config per exercise kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectorConfig {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    pub exercises: BTreeMap<ExerciseKind, ExerciseConfig>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            analysis: AnalysisConfig::default(),
            exercises: ExerciseKind::ALL
                .iter()
                .map(|kind| (*kind, ExerciseConfig::for_kind(*kind)))
                .collect(),
        }
    }
}

/// File overlay: any subset of exercises, analysis tunables optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetectorConfigFile {
    #[serde(default)]
    analysis: Option<AnalysisConfig>,
    #[serde(default)]
    exercises: BTreeMap<ExerciseKind, ExerciseConfig>,
}

impl DetectorConfig {
    pub fn from_env(env_config: &crate::config::AnalysisEnvConfig) -> Result<Self, ConfigError> {
        let mut config = match &env_config.exercise_config_path {
            Some(path) => Self::load_overlay(path)?,
            None => Self::default(),
        };
        if let Some(debounce_ms) = env_config.debounce_ms {
            config.analysis.debounce_ms = debounce_ms;
        }
        if let Some(interval) = env_config.guidance_interval_ms {
            config.analysis.guidance_interval_ms = interval;
        }
        if let Some(frames) = env_config.entry_confirm_frames {
            config.analysis.entry_confirm_frames = frames;
        }
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Reads a JSON overlay and applies it on top of the built-in defaults.
    pub fn load_overlay(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let overlay: DetectorConfigFile = serde_json::from_str(&raw)?;

        let mut config = Self::default();
        if let Some(analysis) = overlay.analysis {
            config.analysis = analysis;
        }
        for (kind, exercise) in overlay.exercises {
            tracing::info!(exercise = %kind, "Exercise config overridden from file");
            config.exercises.insert(kind, exercise);
        }
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    pub fn exercise(&self, kind: ExerciseKind) -> ExerciseConfig {
        self.exercises
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| ExerciseConfig::for_kind(kind))
    }

    pub fn validate(&self) -> Result<(), String> {
        self.analysis.validate()?;
        for (kind, exercise) in &self.exercises {
            exercise.validate().map_err(|e| format!("{kind}: {e}"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = DetectorConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.exercises.len(), ExerciseKind::ALL.len());
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let mut cfg = DetectorConfig::default();
        if let Some(squat) = cfg.exercises.get_mut(&ExerciseKind::Squat) {
            squat.down_threshold_deg = 170.0;
        }
        let err = cfg.validate().unwrap_err();
        assert!(err.starts_with("squat:"), "{err}");
    }

    #[test]
    fn invalid_tunables_are_rejected() {
        let mut cfg = AnalysisConfig::default();
        cfg.debounce_ms = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = AnalysisConfig::default();
        cfg.poor_below = 0.9;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn only_the_curl_is_graded() {
        for kind in ExerciseKind::ALL {
            let graded = ExerciseConfig::for_kind(kind).stability.is_some();
            assert_eq!(graded, kind == ExerciseKind::BicepCurl);
        }
    }

    #[test]
    fn overlay_file_replaces_selected_exercises() {
        let mut squat = ExerciseConfig::for_kind(ExerciseKind::Squat);
        squat.down_threshold_deg = 90.0;
        let body = serde_json::json!({
            "analysis": { "debounceMs": 350, "guidanceIntervalMs": 1000, "goodFrameGuidanceEvery": 10 },
            "exercises": { "squat": squat },
        });

        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, "{body}").expect("write overlay");

        let cfg = DetectorConfig::load_overlay(file.path()).expect("load overlay");
        assert_eq!(cfg.analysis.debounce_ms, 350);
        assert_eq!(cfg.analysis.entry_confirm_frames, 1);
        assert_eq!(cfg.exercise(ExerciseKind::Squat).down_threshold_deg, 90.0);
        assert_eq!(
            cfg.exercise(ExerciseKind::Lunge),
            ExerciseConfig::for_kind(ExerciseKind::Lunge)
        );
    }

    #[test]
    fn overlay_may_set_a_single_tunable() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, "{}", serde_json::json!({ "analysis": { "entryConfirmFrames": 2 } }))
            .expect("write overlay");

        let cfg = DetectorConfig::load_overlay(file.path()).expect("load overlay");
        assert_eq!(
            cfg.analysis,
            AnalysisConfig {
                entry_confirm_frames: 2,
                ..AnalysisConfig::default()
            }
        );
        assert_eq!(cfg.exercises, DetectorConfig::default().exercises);
    }

    #[test]
    fn overlay_errors_are_typed() {
        let missing = DetectorConfig::load_overlay("/definitely/not/here.json").unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));

        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, "{{ not json").expect("write");
        let parse = DetectorConfig::load_overlay(file.path()).unwrap_err();
        assert!(matches!(parse, ConfigError::Parse(_)));

        let mut squat = ExerciseConfig::for_kind(ExerciseKind::Squat);
        squat.required_joints.clear();
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, "{}", serde_json::json!({ "exercises": { "squat": squat } })).expect("write");
        let invalid = DetectorConfig::load_overlay(file.path()).unwrap_err();
        assert!(matches!(invalid, ConfigError::Invalid(_)));
    }
}

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Monotonic milliseconds supplied by the frame producer.
pub type Timestamp = u64;

/// The 17 COCO/MoveNet body joints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointName {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl JointName {
    pub const ALL: [JointName; 17] = [
        JointName::Nose,
        JointName::LeftEye,
        JointName::RightEye,
        JointName::LeftEar,
        JointName::RightEar,
        JointName::LeftShoulder,
        JointName::RightShoulder,
        JointName::LeftElbow,
        JointName::RightElbow,
        JointName::LeftWrist,
        JointName::RightWrist,
        JointName::LeftHip,
        JointName::RightHip,
        JointName::LeftKnee,
        JointName::RightKnee,
        JointName::LeftAnkle,
        JointName::RightAnkle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JointName::Nose => "nose",
            JointName::LeftEye => "left_eye",
            JointName::RightEye => "right_eye",
            JointName::LeftEar => "left_ear",
            JointName::RightEar => "right_ear",
            JointName::LeftShoulder => "left_shoulder",
            JointName::RightShoulder => "right_shoulder",
            JointName::LeftElbow => "left_elbow",
            JointName::RightElbow => "right_elbow",
            JointName::LeftWrist => "left_wrist",
            JointName::RightWrist => "right_wrist",
            JointName::LeftHip => "left_hip",
            JointName::RightHip => "right_hip",
            JointName::LeftKnee => "left_knee",
            JointName::RightKnee => "right_knee",
            JointName::LeftAnkle => "left_ankle",
            JointName::RightAnkle => "right_ankle",
        }
    }

    /// Human readable form used in guidance text ("left knee").
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ")
    }
}

impl fmt::Display for JointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named joint detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub name: JointName,
    pub x: f64,
    pub y: f64,
    pub score: f64,
}

impl Keypoint {
    pub fn new(name: JointName, x: f64, y: f64, score: f64) -> Self {
        Self { name, x, y, score }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }

    fn is_well_formed(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.score.is_finite()
            && (0.0..=1.0).contains(&self.score)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// All keypoints detected for one subject at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub timestamp_ms: Timestamp,
    pub keypoints: Vec<Keypoint>,
}

impl Frame {
    pub fn new(timestamp_ms: Timestamp, keypoints: Vec<Keypoint>) -> Self {
        Self {
            timestamp_ms,
            keypoints,
        }
    }

    /// Empty frames and frames carrying non-finite coordinates or
    /// out-of-range scores are not analysable.
    pub fn is_well_formed(&self) -> bool {
        !self.keypoints.is_empty() && self.keypoints.iter().all(Keypoint::is_well_formed)
    }
}

/// Per-frame joint lookup. Rebuilt every frame.
#[derive(Debug, Clone, Default)]
pub struct KeypointMap {
    joints: HashMap<JointName, Keypoint>,
}

impl KeypointMap {
    pub fn from_frame(frame: &Frame) -> Self {
        let mut joints: HashMap<JointName, Keypoint> = HashMap::with_capacity(frame.keypoints.len());
        for kp in &frame.keypoints {
            // duplicate joint names: keep the most confident detection
            match joints.get(&kp.name) {
                Some(existing) if existing.score >= kp.score => {}
                _ => {
                    joints.insert(kp.name, *kp);
                }
            }
        }
        Self { joints }
    }

    pub fn get(&self, joint: JointName) -> Option<&Keypoint> {
        self.joints.get(&joint)
    }

    /// Confidence of `joint`, 0 when it was not detected at all.
    pub fn score(&self, joint: JointName) -> f64 {
        self.joints.get(&joint).map(|kp| kp.score).unwrap_or(0.0)
    }

    /// The joint if its score clears `min_score` (strictly).
    pub fn visible(&self, joint: JointName, min_score: f64) -> Option<&Keypoint> {
        self.joints.get(&joint).filter(|kp| kp.score > min_score)
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }
}

/// How reliably the required joints are visible in the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DetectionQuality {
    Poor,
    Good,
    Excellent,
}

impl DetectionQuality {
    pub fn is_usable(&self) -> bool {
        !matches!(self, DetectionQuality::Poor)
    }
}

/// Form grade attached to a counted repetition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RepQuality {
    Good,
    Average,
    Poor,
}

impl RepQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepQuality::Good => "good",
            RepQuality::Average => "average",
            RepQuality::Poor => "poor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PoseState {
    #[default]
    Extended,
    Flexed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    Up,
    Down,
}

/// Summary statistics of one completed repetition.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepMetrics {
    pub min_angle: f64,
    pub max_angle: f64,
    pub amplitude: f64,
    pub execution_time_sec: f64,
    pub ascent_velocity_deg_per_sec: f64,
    pub descent_velocity_deg_per_sec: f64,
}

/// A counted repetition as kept in the set history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepRecord {
    pub index: u32,
    pub quality: Option<RepQuality>,
    pub metrics: RepMetrics,
    pub completed_at_ms: Timestamp,
}

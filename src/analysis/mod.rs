//! Pose-stream repetition detection.
//!
//! Converts a stream of per-frame 2D joint detections into repetition
//! events with quality metrics, plus a per-frame detection quality signal.
//!
//! ## Modules
//! - `geometry`: joint angle at a vertex
//! - `visibility`: three-tier detection quality and the good-frame streak
//! - `metrics`: repetition window aggregation
//! - `debounce`: refractory lock after a counted repetition
//! - `feedback`: event vs throttled guidance messages
//! - `analyzer`: the per-exercise state machine
//! - `dispatcher`: exercise selection and analyzer lifecycle
//! - `source`: direct and channel-delivered frame sources

pub mod analyzer;
pub mod config;
pub mod debounce;
pub mod dispatcher;
pub mod exercise;
pub mod feedback;
pub mod geometry;
pub mod metrics;
pub mod source;
pub mod types;
pub mod visibility;

pub use analyzer::{ExerciseAnalyzer, FrameOutcome, FrameReport, RepAnalyzer};
pub use config::{AnalysisConfig, DetectorConfig, ExerciseConfig};
pub use dispatcher::{AnalysisObserver, Dispatcher, SessionSummary, SetSummary};
pub use exercise::ExerciseKind;
pub use feedback::{Feedback, FeedbackKind};
pub use types::{DetectionQuality, Frame, JointName, Keypoint, RepMetrics, RepQuality};

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::analysis::config::{ExerciseConfig, JointTriple};
    use crate::analysis::exercise::ExerciseKind;
    use crate::analysis::types::{Frame, Keypoint, Point, Timestamp};

    const LIMB: f64 = 100.0;

    #[derive(Debug, Clone, Copy)]
    pub struct LimbPose {
        pub angle: f64,
        pub score: f64,
        /// Horizontal shift of the whole limb, pivot included.
        pub dx: f64,
    }

    /// Proximal joint straight above the vertex, distal joint rotated so
    /// the angle at the vertex equals `angle`.
    fn limb(triple: &JointTriple, vertex: Point, pose: LimbPose) -> [Keypoint; 3] {
        let v = Point::new(vertex.x + pose.dx, vertex.y);
        let theta = pose.angle.to_radians();
        [
            Keypoint::new(triple.proximal, v.x, v.y - LIMB, pose.score),
            Keypoint::new(triple.vertex, v.x, v.y, pose.score),
            Keypoint::new(
                triple.distal,
                v.x + LIMB * theta.sin(),
                v.y - LIMB * theta.cos(),
                pose.score,
            ),
        ]
    }

    pub fn frame_with(kind: ExerciseKind, ts: Timestamp, left: LimbPose, right: LimbPose) -> Frame {
        let primary = ExerciseConfig::for_kind(kind).primary_angle;
        let mut keypoints = Vec::with_capacity(6);
        keypoints.extend(limb(&primary.left, Point::new(200.0, 300.0), left));
        keypoints.extend(limb(&primary.right, Point::new(400.0, 300.0), right));
        Frame::new(ts, keypoints)
    }

    pub fn frame_for(kind: ExerciseKind, ts: Timestamp, angle: f64, score: f64) -> Frame {
        let pose = LimbPose {
            angle,
            score,
            dx: 0.0,
        };
        frame_with(kind, ts, pose, pose)
    }

    pub fn shifted_frame_for(kind: ExerciseKind, ts: Timestamp, angle: f64, dx: f64) -> Frame {
        let pose = LimbPose {
            angle,
            score: 0.9,
            dx,
        };
        frame_with(kind, ts, pose, pose)
    }
}

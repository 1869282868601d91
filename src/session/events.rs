use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::analysis::dispatcher::AnalysisObserver;
use crate::analysis::exercise::ExerciseKind;
use crate::analysis::feedback::Feedback;
use crate::analysis::types::{DetectionQuality, PoseState, RepMetrics, RepQuality};

/// What subscribers of a session receive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    Feedback(Feedback),
    #[serde(rename_all = "camelCase")]
    Repetition {
        count: u32,
        quality: Option<RepQuality>,
    },
    RepMetrics(RepMetrics),
    DetectionQuality {
        quality: DetectionQuality,
    },
}

impl SessionEvent {
    /// SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Feedback(_) => "feedback",
            SessionEvent::Repetition { .. } => "repetition",
            SessionEvent::RepMetrics(_) => "repMetrics",
            SessionEvent::DetectionQuality { .. } => "detectionQuality",
        }
    }
}

/// Latest state of a session, published after every processed item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub exercise: Option<ExerciseKind>,
    pub positioning_instructions: Option<String>,
    pub rep_count: u32,
    pub pose_state: Option<PoseState>,
    pub detection_quality: Option<DetectionQuality>,
    pub last_metrics: Option<RepMetrics>,
    pub last_rep_quality: Option<RepQuality>,
    pub frames_analyzed: u64,
    pub frames_skipped: u64,
    pub frames_dropped: u64,
}

impl SessionSnapshot {
    pub fn empty(session_id: Uuid) -> Self {
        Self {
            session_id,
            exercise: None,
            positioning_instructions: None,
            rep_count: 0,
            pose_state: None,
            detection_quality: None,
            last_metrics: None,
            last_rep_quality: None,
            frames_analyzed: 0,
            frames_skipped: 0,
            frames_dropped: 0,
        }
    }
}

/// Forwards detector output to a broadcast channel. Detection quality is
/// only forwarded when it changes.
#[derive(Debug)]
pub struct BroadcastObserver {
    tx: broadcast::Sender<SessionEvent>,
    last_quality: Option<DetectionQuality>,
}

impl BroadcastObserver {
    pub fn new(tx: broadcast::Sender<SessionEvent>) -> Self {
        Self {
            tx,
            last_quality: None,
        }
    }

    /// Fresh analyzer: its first detection quality is forwarded again.
    pub fn exercise_changed(&mut self) {
        self.last_quality = None;
    }

    fn publish(&self, event: SessionEvent) {
        // no subscribers is fine
        let _ = self.tx.send(event);
    }
}

impl AnalysisObserver for BroadcastObserver {
    fn on_feedback(&mut self, feedback: &Feedback) {
        self.publish(SessionEvent::Feedback(feedback.clone()));
    }

    fn on_repetition_counted(&mut self, count: u32, quality: Option<RepQuality>) {
        self.publish(SessionEvent::Repetition { count, quality });
    }

    fn on_rep_metrics(&mut self, metrics: &RepMetrics) {
        self.publish(SessionEvent::RepMetrics(*metrics));
    }

    fn on_detection_quality(&mut self, quality: DetectionQuality) {
        if self.last_quality != Some(quality) {
            self.last_quality = Some(quality);
            self.publish(SessionEvent::DetectionQuality { quality });
        }
    }
}

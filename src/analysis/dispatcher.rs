use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::analyzer::{AnalyzerState, ExerciseAnalyzer, FrameOutcome, RepAnalyzer};
use crate::analysis::config::DetectorConfig;
use crate::analysis::exercise::{self, ExerciseKind, UnknownExercise};
use crate::analysis::feedback::Feedback;
use crate::analysis::types::{DetectionQuality, Frame, RepMetrics, RepQuality, RepRecord};

/// Receives the detector's outputs. Every method defaults to a no-op.
///
/// For one frame the calls arrive in this order: detection quality,
/// feedback, repetition counted, rep metrics.
pub trait AnalysisObserver {
    fn on_feedback(&mut self, _feedback: &Feedback) {}

    fn on_repetition_counted(&mut self, _count: u32, _quality: Option<RepQuality>) {}

    fn on_rep_metrics(&mut self, _metrics: &RepMetrics) {}

    fn on_detection_quality(&mut self, _quality: DetectionQuality) {}
}

impl AnalysisObserver for () {}

/// Keeps every notification in memory; handy for offline replays.
#[derive(Debug, Default, Clone)]
pub struct CollectingObserver {
    pub feedback: Vec<Feedback>,
    pub repetitions: Vec<(u32, Option<RepQuality>)>,
    pub metrics: Vec<RepMetrics>,
    pub qualities: Vec<DetectionQuality>,
}

impl AnalysisObserver for CollectingObserver {
    fn on_feedback(&mut self, feedback: &Feedback) {
        self.feedback.push(feedback.clone());
    }

    fn on_repetition_counted(&mut self, count: u32, quality: Option<RepQuality>) {
        self.repetitions.push((count, quality));
    }

    fn on_rep_metrics(&mut self, metrics: &RepMetrics) {
        self.metrics.push(*metrics);
    }

    fn on_detection_quality(&mut self, quality: DetectionQuality) {
        self.qualities.push(quality);
    }
}

/// Completed repetitions of one exercise selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetSummary {
    pub exercise: ExerciseKind,
    pub rep_count: u32,
    pub reps: Vec<RepRecord>,
    pub frames_analyzed: u64,
    pub frames_skipped: u64,
}

/// Handed to the persistence collaborator when a session ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub sets: Vec<SetSummary>,
}

impl SessionSummary {
    pub fn total_reps(&self) -> u32 {
        self.sets.iter().map(|s| s.rep_count).sum()
    }
}

#[derive(Debug)]
struct ActiveSet {
    analyzer: Box<dyn ExerciseAnalyzer>,
    reps: Vec<RepRecord>,
    frames_analyzed: u64,
    frames_skipped: u64,
    last_quality: Option<DetectionQuality>,
}

impl ActiveSet {
    fn into_summary(self) -> SetSummary {
        SetSummary {
            exercise: self.analyzer.kind(),
            rep_count: self.analyzer.state().rep_count(),
            reps: self.reps,
            frames_analyzed: self.frames_analyzed,
            frames_skipped: self.frames_skipped,
        }
    }
}

/// Routes frames to the analyzer of the selected exercise and owns its
/// lifecycle. Selecting an exercise (even the same one again) or
/// restarting always builds a fresh analyzer; the previous analyzer's
/// partial repetition is dropped and only its completed reps are kept.
#[derive(Debug)]
pub struct Dispatcher {
    session_id: Uuid,
    config: Arc<DetectorConfig>,
    active: Option<ActiveSet>,
    completed_sets: Vec<SetSummary>,
    started_at: DateTime<Utc>,
}

impl Dispatcher {
    pub fn new(session_id: Uuid, config: Arc<DetectorConfig>) -> Self {
        Self {
            session_id,
            config,
            active: None,
            completed_sets: Vec::new(),
            started_at: Utc::now(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Resolves a user-facing exercise name and selects it.
    pub fn select_exercise(
        &mut self,
        name: &str,
        observer: &mut impl AnalysisObserver,
    ) -> Result<ExerciseKind, UnknownExercise> {
        let kind =
            exercise::resolve(name).ok_or_else(|| UnknownExercise(name.trim().to_string()))?;
        self.select(kind, observer);
        Ok(kind)
    }

    pub fn select(&mut self, kind: ExerciseKind, observer: &mut impl AnalysisObserver) {
        self.archive_active();

        let exercise_config = self.config.exercise(kind);
        let instructions = exercise_config.positioning_instructions.clone();
        let analyzer = RepAnalyzer::new(kind, exercise_config, self.config.analysis.clone());
        self.active = Some(ActiveSet {
            analyzer: Box::new(analyzer),
            reps: Vec::new(),
            frames_analyzed: 0,
            frames_skipped: 0,
            last_quality: None,
        });

        tracing::info!(session_id = %self.session_id, exercise = %kind, "Exercise selected");
        if !instructions.is_empty() {
            observer.on_feedback(&Feedback::event(instructions));
        }
    }

    /// Starts the current exercise over with fresh state.
    pub fn restart(&mut self, observer: &mut impl AnalysisObserver) -> Option<ExerciseKind> {
        let kind = self.active_kind()?;
        self.select(kind, observer);
        Some(kind)
    }

    /// Feeds one frame to the active analyzer. Returns `None` when no
    /// exercise is selected.
    pub fn dispatch(
        &mut self,
        frame: &Frame,
        observer: &mut impl AnalysisObserver,
    ) -> Option<FrameOutcome> {
        let Some(active) = self.active.as_mut() else {
            tracing::debug!(session_id = %self.session_id, "Frame ignored, no exercise selected");
            return None;
        };

        let outcome = active.analyzer.consume(frame, frame.timestamp_ms);
        match &outcome {
            FrameOutcome::Skipped(reason) => {
                active.frames_skipped += 1;
                tracing::debug!(
                    session_id = %self.session_id,
                    timestamp_ms = frame.timestamp_ms,
                    ?reason,
                    "Frame skipped"
                );
            }
            FrameOutcome::Analyzed(report) => {
                active.frames_analyzed += 1;
                active.last_quality = Some(report.quality);

                observer.on_detection_quality(report.quality);
                if let Some(guidance) = &report.guidance {
                    observer.on_feedback(guidance);
                }
                if let Some(rep) = &report.rep_completed {
                    observer.on_feedback(&rep.announcement);
                    observer.on_repetition_counted(rep.count, rep.quality);
                    observer.on_rep_metrics(&rep.metrics);
                    active.reps.push(RepRecord {
                        index: rep.count,
                        quality: rep.quality,
                        metrics: rep.metrics,
                        completed_at_ms: report.timestamp_ms,
                    });
                }
            }
        }
        Some(outcome)
    }

    pub fn active_kind(&self) -> Option<ExerciseKind> {
        self.active.as_ref().map(|a| a.analyzer.kind())
    }

    /// Positioning text of the active exercise; empty strings read as `None`.
    pub fn positioning_instructions(&self) -> Option<&str> {
        self.active
            .as_ref()
            .map(|a| a.analyzer.config().positioning_instructions.as_str())
            .filter(|text| !text.is_empty())
    }

    pub fn rep_count(&self) -> u32 {
        self.active
            .as_ref()
            .map(|a| a.analyzer.state().rep_count())
            .unwrap_or(0)
    }

    pub fn detection_quality(&self) -> Option<DetectionQuality> {
        self.active.as_ref().and_then(|a| a.last_quality)
    }

    pub fn analyzer_state(&self) -> Option<&AnalyzerState> {
        self.active.as_ref().map(|a| a.analyzer.state())
    }

    pub fn last_rep(&self) -> Option<&RepRecord> {
        self.active.as_ref().and_then(|a| a.reps.last())
    }

    pub fn frame_counts(&self) -> (u64, u64) {
        self.active
            .as_ref()
            .map(|a| (a.frames_analyzed, a.frames_skipped))
            .unwrap_or((0, 0))
    }

    /// Ends the session. A repetition still in progress is discarded.
    pub fn finish(mut self) -> SessionSummary {
        self.archive_active();
        let summary = SessionSummary {
            session_id: self.session_id,
            started_at: self.started_at,
            ended_at: Utc::now(),
            sets: self.completed_sets,
        };
        tracing::info!(
            session_id = %summary.session_id,
            sets = summary.sets.len(),
            total_reps = summary.total_reps(),
            "Session finished"
        );
        summary
    }

    fn archive_active(&mut self) {
        if let Some(active) = self.active.take() {
            if active.analyzer.state().buffered_samples() > 0 {
                tracing::debug!(
                    session_id = %self.session_id,
                    dropped_samples = active.analyzer.state().buffered_samples(),
                    "Partial repetition discarded"
                );
            }
            if active.frames_analyzed > 0 || !active.reps.is_empty() {
                self.completed_sets.push(active.into_summary());
            }
        }
    }
}

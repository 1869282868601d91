//! Per-exercise repetition state machine.
//!
//! Two logical variables drive counting:
//! - `pose_state`: Extended (resting, initial) or Flexed (working position)
//! - a debounce lock set whenever a repetition is counted
//!
//! Extended → Flexed when the primary angle drops below the down threshold.
//! Flexed → Extended when it rises above the up threshold and the lock has
//! expired; that transition emits the repetition and its metrics. Angles
//! between the thresholds never transition (hysteresis band).

use std::fmt;

use crate::analysis::config::{AnalysisConfig, ExerciseConfig, JointTriple, SideMode, StabilityGrading};
use crate::analysis::debounce::Debouncer;
use crate::analysis::exercise::ExerciseKind;
use crate::analysis::feedback::{Feedback, FeedbackThrottler};
use crate::analysis::geometry::angle_at;
use crate::analysis::metrics::{RepSample, SampleWindow};
use crate::analysis::types::{
    DetectionQuality, Direction, Frame, JointName, KeypointMap, PoseState, RepMetrics, RepQuality,
    Timestamp,
};
use crate::analysis::visibility::{self, GoodFrameStreak};

/// Common interface of every exercise analyzer.
pub trait ExerciseAnalyzer: Send + fmt::Debug {
    fn kind(&self) -> ExerciseKind;

    fn config(&self) -> &ExerciseConfig;

    /// Processes one frame. Never blocks and never fails: frames that cannot
    /// be analysed are reported as skipped and leave the state untouched.
    fn consume(&mut self, frame: &Frame, now: Timestamp) -> FrameOutcome;

    fn state(&self) -> &AnalyzerState;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Empty frame, non-finite coordinates or out-of-range scores.
    Malformed,
    /// Timestamp older than the last accepted frame.
    OutOfOrder,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    Skipped(SkipReason),
    Analyzed(FrameReport),
}

impl FrameOutcome {
    pub fn report(&self) -> Option<&FrameReport> {
        match self {
            FrameOutcome::Analyzed(report) => Some(report),
            FrameOutcome::Skipped(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub timestamp_ms: Timestamp,
    pub quality: DetectionQuality,
    pub visible_fraction: f64,
    /// `None` when no side was visible enough to measure.
    pub primary_angle: Option<f64>,
    pub pose_state: PoseState,
    pub rep_count: u32,
    pub rep_completed: Option<CompletedRep>,
    pub guidance: Option<Feedback>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletedRep {
    pub count: u32,
    pub quality: Option<RepQuality>,
    pub metrics: RepMetrics,
    pub announcement: Feedback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MeasuredSide {
    Left,
    Right,
    Both,
}

#[derive(Debug, Clone, Copy)]
struct MeasuredAngle {
    degrees: f64,
    side: MeasuredSide,
}

/// Pivot drift while flexed, per side.
#[derive(Debug, Clone, Default)]
struct StabilityProbe {
    left_origin_x: Option<f64>,
    right_origin_x: Option<f64>,
    max_displacement: f64,
}

impl StabilityProbe {
    fn observe(&mut self, left_x: Option<f64>, right_x: Option<f64>) {
        for (origin, current) in [(self.left_origin_x, left_x), (self.right_origin_x, right_x)] {
            if let (Some(origin), Some(current)) = (origin, current) {
                self.max_displacement = self.max_displacement.max((current - origin).abs());
            }
        }
    }
}

/// Mutable per-session state, exclusively owned by one analyzer.
#[derive(Debug, Clone)]
pub struct AnalyzerState {
    pose_state: PoseState,
    debouncer: Debouncer,
    rep_count: u32,
    streak: GoodFrameStreak,
    throttler: FeedbackThrottler,
    window: SampleWindow,
    direction: Option<Direction>,
    entry_frames: u32,
    stability: Option<StabilityProbe>,
    last_timestamp: Option<Timestamp>,
}

impl AnalyzerState {
    pub fn new(analysis: &AnalysisConfig) -> Self {
        Self {
            pose_state: PoseState::Extended,
            debouncer: Debouncer::new(analysis.debounce_ms),
            rep_count: 0,
            streak: GoodFrameStreak::new(analysis.good_frame_guidance_every),
            throttler: FeedbackThrottler::new(analysis.guidance_interval_ms),
            window: SampleWindow::new(analysis.max_buffered_samples),
            direction: None,
            entry_frames: 0,
            stability: None,
            last_timestamp: None,
        }
    }

    pub fn pose_state(&self) -> PoseState {
        self.pose_state
    }

    pub fn rep_count(&self) -> u32 {
        self.rep_count
    }

    pub fn debounce_locked_until(&self) -> Option<Timestamp> {
        self.debouncer.locked_until()
    }

    pub fn consecutive_good_frames(&self) -> u32 {
        self.streak.consecutive()
    }

    pub fn last_guidance_feedback_at(&self) -> Option<Timestamp> {
        self.throttler.last_guidance_at()
    }

    pub fn buffered_samples(&self) -> usize {
        self.window.len()
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    pub fn segment_start(&self) -> Option<Timestamp> {
        self.window.first().map(|s| s.timestamp_ms)
    }
}

/// Config-driven analyzer shared by every supported exercise kind; the
/// per-kind behaviour (which joints, one side or both, form grading) comes
/// from its `ExerciseConfig`.
#[derive(Debug)]
pub struct RepAnalyzer {
    kind: ExerciseKind,
    config: ExerciseConfig,
    analysis: AnalysisConfig,
    state: AnalyzerState,
}

impl RepAnalyzer {
    pub fn new(kind: ExerciseKind, config: ExerciseConfig, analysis: AnalysisConfig) -> Self {
        let state = AnalyzerState::new(&analysis);
        Self {
            kind,
            config,
            analysis,
            state,
        }
    }

    fn primary_angle(&self, keypoints: &KeypointMap) -> Option<MeasuredAngle> {
        let primary = &self.config.primary_angle;
        let min_score = self.config.min_visibility_score;

        if primary.mode == SideMode::Bilateral {
            let strict = self.config.bilateral_visibility_score;
            if let (Some((left, _)), Some((right, _))) = (
                side_angle(keypoints, &primary.left, strict),
                side_angle(keypoints, &primary.right, strict),
            ) {
                return Some(MeasuredAngle {
                    degrees: (left + right) / 2.0,
                    side: MeasuredSide::Both,
                });
            }
        }

        let left = side_angle(keypoints, &primary.left, min_score);
        let right = side_angle(keypoints, &primary.right, min_score);
        match (left, right) {
            (Some((l, l_score)), Some((r, r_score))) => Some(if r_score > l_score {
                MeasuredAngle {
                    degrees: r,
                    side: MeasuredSide::Right,
                }
            } else {
                MeasuredAngle {
                    degrees: l,
                    side: MeasuredSide::Left,
                }
            }),
            (Some((l, _)), None) => Some(MeasuredAngle {
                degrees: l,
                side: MeasuredSide::Left,
            }),
            (None, Some((r, _))) => Some(MeasuredAngle {
                degrees: r,
                side: MeasuredSide::Right,
            }),
            (None, None) => None,
        }
    }

    fn pivot_x(&self, keypoints: &KeypointMap, side: MeasuredSide) -> (Option<f64>, Option<f64>) {
        let primary = &self.config.primary_angle;
        let cutoff = self.config.min_visibility_score;
        let x = |joint: JointName| keypoints.visible(joint, cutoff).map(|kp| kp.x);
        match side {
            MeasuredSide::Left => (x(primary.left.vertex), None),
            MeasuredSide::Right => (None, x(primary.right.vertex)),
            MeasuredSide::Both => (x(primary.left.vertex), x(primary.right.vertex)),
        }
    }

    fn guidance(&mut self, report: &visibility::VisibilityReport, now: Timestamp) -> Option<Feedback> {
        let celebrate = self.state.streak.observe(report.quality);
        let message = match report.quality {
            DetectionQuality::Poor => missing_joints_message(&report.missing),
            DetectionQuality::Good | DetectionQuality::Excellent => match celebrate? {
                DetectionQuality::Excellent => "Excellent positioning".to_string(),
                _ => "Positioning is improving".to_string(),
            },
        };
        self.state.throttler.guidance(message, now)
    }

    fn step(
        &mut self,
        measured: MeasuredAngle,
        keypoints: &KeypointMap,
        now: Timestamp,
    ) -> Option<CompletedRep> {
        let sample = RepSample::new(measured.degrees, now);
        let mut starts_window = true;
        if let Some(last) = self.state.window.last() {
            if measured.degrees < last.angle_deg {
                self.state.direction = Some(Direction::Down);
                starts_window = false;
            } else if measured.degrees > last.angle_deg {
                self.state.direction = Some(Direction::Up);
            } else {
                // a plateau restarts the window only while it is the peak itself
                starts_window = self.state.window.len() == 1;
            }
        }

        match self.state.pose_state {
            PoseState::Extended => {
                if starts_window || measured.degrees >= self.config.up_threshold_deg {
                    self.state.window.restart_at(sample);
                } else {
                    self.state.window.push(sample);
                }

                if measured.degrees < self.config.down_threshold_deg {
                    self.state.entry_frames += 1;
                    if self.state.entry_frames >= self.analysis.entry_confirm_frames {
                        self.enter_flexed(measured, keypoints);
                    }
                } else {
                    self.state.entry_frames = 0;
                }
                None
            }
            PoseState::Flexed => {
                self.state.window.push(sample);
                if self.config.stability.is_some() {
                    let (left_x, right_x) = self.pivot_x(keypoints, MeasuredSide::Both);
                    if let Some(probe) = self.state.stability.as_mut() {
                        probe.observe(left_x, right_x);
                    }
                }

                if measured.degrees > self.config.up_threshold_deg {
                    self.complete(now)
                } else {
                    None
                }
            }
        }
    }

    fn enter_flexed(&mut self, measured: MeasuredAngle, keypoints: &KeypointMap) {
        self.state.pose_state = PoseState::Flexed;
        self.state.direction = Some(Direction::Down);
        self.state.entry_frames = 0;
        self.state.stability = self.config.stability.map(|_| {
            let (left_origin_x, right_origin_x) = self.pivot_x(keypoints, measured.side);
            StabilityProbe {
                left_origin_x,
                right_origin_x,
                max_displacement: 0.0,
            }
        });
        tracing::debug!(
            exercise = %self.kind,
            angle = measured.degrees,
            buffered = self.state.window.len(),
            "Entered flexed position"
        );
    }

    fn complete(&mut self, now: Timestamp) -> Option<CompletedRep> {
        self.state.pose_state = PoseState::Extended;
        self.state.direction = Some(Direction::Up);
        let probe = self.state.stability.take();

        if self.state.debouncer.is_locked(now) {
            // the crossing is consumed so it cannot be counted once the lock expires
            self.state.window.clear();
            tracing::debug!(
                exercise = %self.kind,
                locked_until = ?self.state.debouncer.locked_until(),
                "Repetition suppressed by debounce lock"
            );
            return None;
        }

        let metrics = self.state.window.aggregate();
        self.state.window.clear();
        self.state.rep_count += 1;
        self.state.debouncer.lock(now);

        let graded = self
            .config
            .stability
            .map(|grading| grade(&grading, metrics.min_angle, probe.as_ref()));
        let count = self.state.rep_count;
        let announcement = Feedback::event(announcement(count, graded));

        tracing::info!(
            exercise = %self.kind,
            rep_count = count,
            quality = graded.map(|(q, _)| q.as_str()),
            min_angle = metrics.min_angle,
            max_angle = metrics.max_angle,
            execution_time_sec = metrics.execution_time_sec,
            "Repetition counted"
        );

        Some(CompletedRep {
            count,
            quality: graded.map(|(q, _)| q),
            metrics,
            announcement,
        })
    }
}

impl ExerciseAnalyzer for RepAnalyzer {
    fn kind(&self) -> ExerciseKind {
        self.kind
    }

    fn config(&self) -> &ExerciseConfig {
        &self.config
    }

    fn consume(&mut self, frame: &Frame, now: Timestamp) -> FrameOutcome {
        if !frame.is_well_formed() {
            return FrameOutcome::Skipped(SkipReason::Malformed);
        }
        if matches!(self.state.last_timestamp, Some(last) if now < last) {
            return FrameOutcome::Skipped(SkipReason::OutOfOrder);
        }
        self.state.last_timestamp = Some(now);

        let keypoints = KeypointMap::from_frame(frame);
        let report = visibility::assess(&keypoints, &self.config, &self.analysis);
        let guidance = self.guidance(&report, now);

        let measured = self.primary_angle(&keypoints);
        let rep_completed = measured.and_then(|m| self.step(m, &keypoints, now));

        FrameOutcome::Analyzed(FrameReport {
            timestamp_ms: now,
            quality: report.quality,
            visible_fraction: report.visible_fraction,
            primary_angle: measured.map(|m| m.degrees),
            pose_state: self.state.pose_state,
            rep_count: self.state.rep_count,
            rep_completed,
            guidance,
        })
    }

    fn state(&self) -> &AnalyzerState {
        &self.state
    }
}

/// Angle of one side and the weakest score of its three joints.
fn side_angle(keypoints: &KeypointMap, triple: &JointTriple, min_score: f64) -> Option<(f64, f64)> {
    let a = keypoints.visible(triple.proximal, min_score)?;
    let b = keypoints.visible(triple.vertex, min_score)?;
    let c = keypoints.visible(triple.distal, min_score)?;
    let weakest = a.score.min(b.score).min(c.score);
    Some((angle_at(a.point(), b.point(), c.point()), weakest))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GradeHint {
    Unstable,
    Shallow,
}

fn grade(
    grading: &StabilityGrading,
    min_angle: f64,
    probe: Option<&StabilityProbe>,
) -> (RepQuality, Option<GradeHint>) {
    let unstable = probe.is_some_and(|p| p.max_displacement > grading.tolerance_px);
    if unstable {
        (RepQuality::Poor, Some(GradeHint::Unstable))
    } else if min_angle <= grading.good_depth_deg {
        (RepQuality::Good, None)
    } else if min_angle <= grading.average_depth_deg {
        (RepQuality::Average, Some(GradeHint::Shallow))
    } else {
        (RepQuality::Poor, Some(GradeHint::Shallow))
    }
}

fn announcement(count: u32, graded: Option<(RepQuality, Option<GradeHint>)>) -> String {
    match graded {
        None => format!("Repetition {count} completed"),
        Some((quality, hint)) => {
            let tail = match hint {
                None => String::new(),
                Some(GradeHint::Unstable) => ": keep the pivot joint still".to_string(),
                Some(GradeHint::Shallow) => ": use a fuller range of motion".to_string(),
            };
            format!("Repetition {count} completed ({} form){tail}", quality.as_str())
        }
    }
}

fn missing_joints_message(missing: &[JointName]) -> String {
    let labels: Vec<String> = missing.iter().map(JointName::label).collect();
    match labels.as_slice() {
        [] => "Adjust your position so your whole body is visible".to_string(),
        [only] => format!("Move so your {only} is visible"),
        [init @ .., last] => format!("Move so your {} and {last} are visible", init.join(", ")),
    }
}

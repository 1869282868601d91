//! Detection quality assessment.
//!
//! The share of required joints whose score clears the exercise's visibility
//! cutoff is mapped onto three tiers:
//! - Poor: below `poor_below` (50% by default)
//! - Good: between the two boundaries, inclusive
//! - Excellent: above `excellent_above` (80% by default)

use crate::analysis::config::{AnalysisConfig, ExerciseConfig};
use crate::analysis::types::{DetectionQuality, JointName, KeypointMap};

#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityReport {
    pub quality: DetectionQuality,
    pub visible_fraction: f64,
    /// Required joints that did not clear the cutoff, in config order.
    pub missing: Vec<JointName>,
}

pub fn assess(
    keypoints: &KeypointMap,
    exercise: &ExerciseConfig,
    analysis: &AnalysisConfig,
) -> VisibilityReport {
    let required = &exercise.required_joints;
    if required.is_empty() {
        return VisibilityReport {
            quality: DetectionQuality::Poor,
            visible_fraction: 0.0,
            missing: Vec::new(),
        };
    }

    let missing: Vec<JointName> = required
        .iter()
        .copied()
        .filter(|joint| keypoints.score(*joint) <= exercise.min_visibility_score)
        .collect();
    let visible = required.len() - missing.len();
    let visible_fraction = visible as f64 / required.len() as f64;

    VisibilityReport {
        quality: tier(visible_fraction, analysis),
        visible_fraction,
        missing,
    }
}

pub fn tier(visible_fraction: f64, analysis: &AnalysisConfig) -> DetectionQuality {
    if visible_fraction < analysis.poor_below {
        DetectionQuality::Poor
    } else if visible_fraction > analysis.excellent_above {
        DetectionQuality::Excellent
    } else {
        DetectionQuality::Good
    }
}

/// Counts consecutive usable frames and signals every `every`-th one, so
/// positive guidance frequency does not depend on the camera frame rate.
#[derive(Debug, Clone)]
pub struct GoodFrameStreak {
    consecutive: u32,
    every: u32,
}

impl GoodFrameStreak {
    pub fn new(every: u32) -> Self {
        Self {
            consecutive: 0,
            every: every.max(1),
        }
    }

    /// Returns the tier to celebrate when the streak reaches a multiple of `every`.
    pub fn observe(&mut self, quality: DetectionQuality) -> Option<DetectionQuality> {
        if !quality.is_usable() {
            self.consecutive = 0;
            return None;
        }
        self.consecutive = self.consecutive.saturating_add(1);
        if self.consecutive % self.every == 0 {
            Some(quality)
        } else {
            None
        }
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }
}

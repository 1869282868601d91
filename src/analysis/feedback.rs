//! Feedback channels.
//!
//! Event feedback (repetition counts, exercise announcements) is always
//! delivered. Guidance feedback (positioning hints) is rate limited so it
//! cannot flood the UI at frame rate.

use serde::{Deserialize, Serialize};

use crate::analysis::types::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeedbackKind {
    Event,
    Guidance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub kind: FeedbackKind,
    pub message: String,
}

impl Feedback {
    pub fn event(message: impl Into<String>) -> Self {
        Self {
            kind: FeedbackKind::Event,
            message: message.into(),
        }
    }

    pub fn guidance(message: impl Into<String>) -> Self {
        Self {
            kind: FeedbackKind::Guidance,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeedbackThrottler {
    min_interval_ms: u64,
    last_guidance_at: Option<Timestamp>,
}

impl FeedbackThrottler {
    pub fn new(min_interval_ms: u64) -> Self {
        Self {
            min_interval_ms,
            last_guidance_at: None,
        }
    }

    /// Delivers guidance only if more than `min_interval_ms` elapsed since
    /// the last delivered guidance; otherwise drops it.
    pub fn guidance(&mut self, message: impl Into<String>, now: Timestamp) -> Option<Feedback> {
        if let Some(last) = self.last_guidance_at {
            if now.saturating_sub(last) <= self.min_interval_ms {
                return None;
            }
        }
        self.last_guidance_at = Some(now);
        Some(Feedback::guidance(message))
    }

    pub fn last_guidance_at(&self) -> Option<Timestamp> {
        self.last_guidance_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guidance_within_interval_is_dropped() {
        let mut throttler = FeedbackThrottler::new(1500);
        assert!(throttler.guidance("step back", 1_000).is_some());
        assert!(throttler.guidance("step back", 1_200).is_none());
        assert!(throttler.guidance("step back", 2_500).is_none());
        assert!(throttler.guidance("step back", 2_501).is_some());
    }

    #[test]
    fn feedback_serializes_kind_and_message() {
        let json = serde_json::to_value(Feedback::event("Repetition 2 completed")).expect("serialize");
        assert_eq!(json, serde_json::json!({ "kind": "event", "message": "Repetition 2 completed" }));
        assert_eq!(Feedback::guidance("step back").kind, FeedbackKind::Guidance);
    }

    #[test]
    fn first_guidance_is_always_delivered() {
        let mut throttler = FeedbackThrottler::new(1500);
        let delivered = throttler.guidance("hint", 0).expect("delivered");
        assert_eq!(delivered.kind, FeedbackKind::Guidance);
    }
}

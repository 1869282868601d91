//! Refractory window after a counted repetition.
//!
//! Independent of the hysteresis band: a noisy subject can fully re-extend
//! and re-flex inside a few frames, so completions are refused until the
//! recorded lock time has passed.

use crate::analysis::types::Timestamp;

#[derive(Debug, Clone)]
pub struct Debouncer {
    window_ms: u64,
    locked_until: Option<Timestamp>,
}

impl Debouncer {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            locked_until: None,
        }
    }

    /// A completion at `now` is refused while `now <= locked_until`.
    pub fn is_locked(&self, now: Timestamp) -> bool {
        matches!(self.locked_until, Some(until) if now <= until)
    }

    pub fn lock(&mut self, now: Timestamp) {
        self.locked_until = Some(now.saturating_add(self.window_ms));
    }

    pub fn locked_until(&self) -> Option<Timestamp> {
        self.locked_until
    }
}

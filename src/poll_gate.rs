use std::time::{Duration, Instant};

use crate::cricket_api::FeedMode;

/// Decides when the scoreboard fetches and how much. Both cadences pause while the
/// board is hidden; becoming visible again forces an immediate full fetch.
#[derive(Debug, Clone)]
pub struct PollGate {
    fast: Duration,
    slow: Duration,
    visible: bool,
    catch_up: bool,
    last_fast: Option<Instant>,
    last_full: Option<Instant>,
}

impl PollGate {
    pub fn new(fast: Duration, slow: Duration) -> Self {
        Self {
            fast,
            slow,
            visible: true,
            catch_up: false,
            last_fast: None,
            last_full: None,
        }
    }

    pub fn due(&mut self, now: Instant) -> Option<FeedMode> {
        if !self.visible {
            return None;
        }
        let full_due = self.catch_up
            || self
                .last_full
                .is_none_or(|at| now.saturating_duration_since(at) >= self.slow);
        if full_due {
            self.catch_up = false;
            self.last_full = Some(now);
            self.last_fast = Some(now);
            return Some(FeedMode::Full);
        }
        let fast_due = self
            .last_fast
            .is_none_or(|at| now.saturating_duration_since(at) >= self.fast);
        if fast_due {
            self.last_fast = Some(now);
            return Some(FeedMode::LiveOnly);
        }
        None
    }

    pub fn set_visible(&mut self, visible: bool) {
        if visible && !self.visible {
            self.catch_up = true;
        }
        self.visible = visible;
    }

    /// Manual refresh: the next `due` returns a full fetch even mid-interval.
    pub fn request_full(&mut self) {
        self.catch_up = true;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

//! Per-key rolling window of attempt timestamps.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Timestamps of recent attempts for one client key.
///
/// Invariant after [`prune`](RateWindow::prune): every held timestamp `t`
/// satisfies `now - t < window`. An absent window and an empty window are
/// equivalent.
#[derive(Debug, Default)]
pub struct RateWindow {
    events: VecDeque<Instant>,
}

impl RateWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every timestamp that has fallen out of the window.
    pub fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(oldest) = self.events.front() {
            if now.duration_since(*oldest) >= window {
                self.events.pop_front();
            } else {
                break;
            }
        }
    }

    /// Record an attempt.
    pub fn record(&mut self, at: Instant) {
        self.events.push_back(at);
    }

    /// The earliest attempt still inside the window.
    pub fn oldest(&self) -> Option<Instant> {
        self.events.front().copied()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

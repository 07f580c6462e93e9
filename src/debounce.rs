//! Trailing-edge debouncing for resize bursts.
//!
//! Window resizing fires notifications far faster than a replacement pass
//! should run. The debouncer collapses a burst to a single firing: each
//! [`signal`](Debouncer::signal) re-arms the deadline at `now + interval`,
//! superseding any earlier pending firing, and [`fire`](Debouncer::fire)
//! reports (once) when the deadline has passed with no further signals.
//!
//! Time is injected as [`Instant`] arguments rather than read from a
//! clock, so the coordinator is testable without waiting on real timers.

use std::time::{Duration, Instant};

/// Trailing-edge debouncer over injected time.
#[derive(Debug)]
pub struct Debouncer {
    interval: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
        }
    }

    /// Record a signal at `now`, re-arming the deadline. Only the most
    /// recent signal survives; earlier pending firings are superseded.
    pub fn signal(&mut self, now: Instant) {
        self.deadline = Some(now + self.interval);
    }

    /// True exactly once per armed deadline, when `now` has reached it.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Whether a firing is pending.
    pub fn pending(&self) -> bool {
        self.deadline.is_some()
    }
}

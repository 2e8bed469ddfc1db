use std::time::{Duration, Instant};

/// Default display refresh interval in milliseconds
pub const DEFAULT_TICK_MS: u64 = 1000;

/// Default autosave interval in seconds
pub const DEFAULT_AUTOSAVE_SECS: u64 = 60;

/// Fires once every `period`, driven by the caller's loop
#[derive(Debug, Clone)]
pub struct Interval {
    period: Duration,
    next: Instant,
}

impl Interval {
    pub fn new(period: Duration, now: Instant) -> Self {
        Self {
            period,
            next: now + period,
        }
    }

    /// True once per elapsed period; missed periods collapse into one firing
    pub fn due(&mut self, now: Instant) -> bool {
        if now < self.next {
            return false;
        }
        while self.next <= now {
            self.next += self.period;
        }
        true
    }

    /// Time left until the next firing
    pub fn remaining(&self, now: Instant) -> Duration {
        self.next.saturating_duration_since(now)
    }
}

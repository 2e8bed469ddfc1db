use chrono::{DateTime, Local};

/// Source of wall-clock time for the tracker
pub trait Clock {
    fn now(&self) -> DateTime<Local>;
}

/// Clock backed by the system's local time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

#[cfg(test)]
pub use manual::ManualClock;


#[cfg(test)]
pub use manual::local;

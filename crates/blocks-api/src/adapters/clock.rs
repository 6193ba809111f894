//! Settable clock for tests and replay.

use crate::ports::TimeSource;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::time::Duration;

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualTimeSource {
    now: RwLock<DateTime<Utc>>,
}

impl ManualTimeSource {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.write() = at;
    }

    pub fn advance(&self, by: Duration) {
        let step = chrono::Duration::from_std(by).unwrap_or(chrono::Duration::MAX);
        let mut now = self.now.write();
        *now = now.checked_add_signed(step).unwrap_or(*now);
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}

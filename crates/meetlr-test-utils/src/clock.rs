// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A clock that only moves when the test says so.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use meetlr_core::Clock;

#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::base_time;

    #[test]
    fn advance_moves_forward() {
        let clock = ManualClock::new(base_time());
        clock.advance(Duration::minutes(5));
        assert_eq!(clock.now(), base_time() + Duration::minutes(5));
        clock.set(base_time());
        assert_eq!(clock.now(), base_time());
    }
}

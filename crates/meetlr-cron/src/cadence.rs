// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Runs a job once every `every_polls` poller ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cadence {
    every_polls: u32,
    counter: u32,
}

impl Cadence {
    /// `every_polls` of zero is treated as one.
    pub fn every(every_polls: u32) -> Self {
        Self {
            every_polls: every_polls.max(1),
            counter: 0,
        }
    }

    /// Count one tick; returns `true` when the job is due on this tick.
    pub fn advance(&mut self) -> bool {
        self.counter += 1;
        if self.counter >= self.every_polls {
            self.counter = 0;
            true
        } else {
            false
        }
    }

    pub fn every_polls(&self) -> u32 {
        self.every_polls
    }
}

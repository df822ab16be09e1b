// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exponential backoff between transient failures.

use chrono::Duration;
use meetlr_config::model::TasksConfig;

/// `delay = min(base * 2^retry_count, cap)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_secs: u64,
    pub cap_secs: u64,
}

impl RetryPolicy {
    pub fn new(base_secs: u64, cap_secs: u64) -> Self {
        Self { base_secs, cap_secs }
    }

    pub fn from_config(config: &TasksConfig) -> Self {
        Self::new(config.backoff_base_secs, config.backoff_cap_secs)
    }

    /// Delay before the attempt following failure number `retry_count + 1`.
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        let factor = 1u64.checked_shl(retry_count).unwrap_or(u64::MAX);
        let secs = self
            .base_secs
            .saturating_mul(factor)
            .min(self.cap_secs)
            .min(i64::MAX as u64);
        Duration::seconds(secs as i64)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&TasksConfig::default())
    }
}

// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Named policy parameters derived from configuration.

use chrono::Duration;
use meetlr_config::MeetlrConfig;
use meetlr_config::model::{BookingConfig, TasksConfig};

/// Rules enforced by booking transitions.
#[derive(Debug, Clone)]
pub struct BookingPolicy {
    /// A reschedule's new start must be more than this far from now.
    pub reschedule_notice: Duration,
    pub max_reschedules: u32,
    pub pending_payment_timeout: Duration,
    pub slot_hold: Duration,
}

impl BookingPolicy {
    pub fn from_config(config: &BookingConfig) -> Self {
        Self {
            reschedule_notice: Duration::hours(config.reschedule_notice_hours),
            max_reschedules: config.max_reschedules,
            pending_payment_timeout: Duration::minutes(config.pending_payment_timeout_minutes),
            slot_hold: Duration::minutes(config.slot_hold_minutes),
        }
    }
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self::from_config(&BookingConfig::default())
    }
}

/// Scheduling parameters applied when tasks are enqueued.
#[derive(Debug, Clone)]
pub struct TaskPolicy {
    pub max_retries: u32,
    pub reminder_offset: Duration,
    pub follow_up_offset: Duration,
    pub sms_reminder_offset: Duration,
}

impl TaskPolicy {
    pub fn from_config(config: &TasksConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            reminder_offset: config.reminder_offset(),
            follow_up_offset: config.follow_up_offset(),
            sms_reminder_offset: config.sms_reminder_offset(),
        }
    }
}

impl Default for TaskPolicy {
    fn default() -> Self {
        Self::from_config(&TasksConfig::default())
    }
}

/// Both policies, built once from the loaded configuration.
#[derive(Debug, Clone, Default)]
pub struct Policies {
    pub booking: BookingPolicy,
    pub tasks: TaskPolicy,
}

impl Policies {
    pub fn from_config(config: &MeetlrConfig) -> Self {
        Self {
            booking: BookingPolicy::from_config(&config.booking),
            tasks: TaskPolicy::from_config(&config.tasks),
        }
    }
}

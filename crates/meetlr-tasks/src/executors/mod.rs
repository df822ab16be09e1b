// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in executors, one per side-effect family.

pub mod calendar;
pub mod meeting;
pub mod notification;
pub mod payment;

pub use calendar::{CalendarEventCreateExecutor, CalendarEventDeleteExecutor};
pub use meeting::{VideoMeetingCreateExecutor, VideoMeetingDeleteExecutor};
pub use notification::NotificationExecutor;
pub use payment::RefundPaymentExecutor;

use meetlr_core::{Booking, PendingTask};

use crate::executor::ExecutionError;

/// The booking a provider task acts on; these kinds are never enqueued without one.
pub(crate) fn require_booking<'a>(
    task: &PendingTask,
    booking: Option<&'a Booking>,
) -> Result<&'a Booking, ExecutionError> {
    booking.ok_or_else(|| {
        ExecutionError::permanent(format!("{} task {} has no booking", task.kind, task.id))
    })
}

pub(crate) fn payload_mismatch(task: &PendingTask) -> ExecutionError {
    ExecutionError::permanent(format!(
        "{} task {} carries an unexpected payload",
        task.kind, task.id
    ))
}

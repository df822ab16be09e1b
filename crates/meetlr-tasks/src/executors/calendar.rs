// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Calendar event sync.
//!
//! A create task names the event it supersedes (if any). The create runs
//! only while the booking records no event or still records that superseded
//! one, so a duplicate or out-of-order create never adds a second event.

use std::sync::Arc;

use async_trait::async_trait;
use meetlr_core::types::CalendarEventRequest;
use meetlr_core::{
    Booking, BookingStatus, BookingUpdate, CalendarProvider, PendingTask, TaskKind, TaskPayload,
    TaskTrigger,
};
use tracing::{debug, warn};

use crate::executor::{ExecutionError, ExecutionOutcome, TaskExecutor};
use crate::executors::{payload_mismatch, require_booking};

pub struct CalendarEventCreateExecutor {
    provider: Arc<dyn CalendarProvider>,
}

impl CalendarEventCreateExecutor {
    pub fn new(provider: Arc<dyn CalendarProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl TaskExecutor for CalendarEventCreateExecutor {
    fn name(&self) -> &'static str {
        "calendar_event_create"
    }

    fn kinds(&self) -> &'static [TaskKind] {
        &[TaskKind::CalendarEventCreate]
    }

    async fn execute(
        &self,
        task: &PendingTask,
        booking: Option<&Booking>,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        let TaskPayload::CalendarEvent {
            title,
            start,
            end,
            event_id: superseded,
            ..
        } = &task.payload
        else {
            return Err(payload_mismatch(task));
        };
        let booking = require_booking(task, booking)?;
        if booking.status == BookingStatus::Cancelled {
            return Err(ExecutionError::permanent(
                "booking cancelled before the calendar event was created",
            ));
        }
        if let Some(current) = &booking.calendar_event_id
            && superseded.as_ref() != Some(current)
        {
            debug!(task_id = %task.id, event_id = %current, "calendar event already recorded");
            return Ok(ExecutionOutcome::done());
        }

        let results = self
            .provider
            .create_event(CalendarEventRequest {
                user_id: task.user_id.clone(),
                booking_id: booking.id.clone(),
                title: title.clone(),
                start: *start,
                end: *end,
                attendee_email: booking.attendee_email.clone(),
            })
            .await?;

        let mut errors = Vec::new();
        for r in &results {
            if !r.success {
                warn!(task_id = %task.id, provider = %r.provider, error = ?r.error, "calendar rejected event");
                errors.push(format!(
                    "{}: {}",
                    r.provider,
                    r.error.as_deref().unwrap_or("unknown error")
                ));
            }
        }
        let created = results.into_iter().find_map(|r| match r {
            meetlr_core::types::CalendarResult {
                success: true,
                schedule_id: Some(schedule_id),
                event_id: Some(event_id),
                ..
            } => Some((schedule_id, event_id)),
            _ => None,
        });
        match created {
            Some((schedule_id, event_id)) => Ok(ExecutionOutcome::with_update(
                BookingUpdate::SetCalendarEvent {
                    schedule_id,
                    event_id: event_id.clone(),
                },
            )
            .external_id(event_id)),
            None if errors.is_empty() => Err(ExecutionError::transient(
                "no connected calendar accepted the event",
            )),
            None => Err(ExecutionError::transient(errors.join("; "))),
        }
    }
}

pub struct CalendarEventDeleteExecutor {
    provider: Arc<dyn CalendarProvider>,
}

impl CalendarEventDeleteExecutor {
    pub fn new(provider: Arc<dyn CalendarProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl TaskExecutor for CalendarEventDeleteExecutor {
    fn name(&self) -> &'static str {
        "calendar_event_delete"
    }

    fn kinds(&self) -> &'static [TaskKind] {
        &[TaskKind::CalendarEventDelete]
    }

    async fn execute(
        &self,
        task: &PendingTask,
        booking: Option<&Booking>,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        let TaskPayload::CalendarEvent {
            schedule_id,
            event_id,
            ..
        } = &task.payload
        else {
            return Err(payload_mismatch(task));
        };
        let Some(event_id) = event_id.as_deref().filter(|id| !id.is_empty()) else {
            return Ok(ExecutionOutcome::done());
        };
        let cleared = booking.is_some_and(|b| b.calendar_event_id.is_none());
        if task.trigger == TaskTrigger::Cancelled && cleared {
            debug!(task_id = %task.id, "calendar event already cleared on booking");
            return Ok(ExecutionOutcome::done());
        }

        let schedule_id = schedule_id.as_deref().unwrap_or_default();
        if !self.provider.delete_event(schedule_id, event_id).await? {
            return Err(ExecutionError::transient(format!(
                "calendar refused to delete event {event_id}"
            )));
        }
        let current = booking.is_some_and(|b| b.calendar_event_id.as_deref() == Some(event_id));
        Ok(if current {
            ExecutionOutcome::with_update(BookingUpdate::ClearCalendarEvent)
        } else {
            ExecutionOutcome::done()
        })
    }
}

// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Enqueuing handlers for booking lifecycle events.
//!
//! Every handler evaluates its precondition once, against the booking as it
//! stands after the transition. Rows carry everything their executor needs
//! in a typed payload.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use meetlr_core::time::format_ts;
use meetlr_core::{
    Booking, LifecycleDetail, LifecycleEvent, LifecycleKind, MeetlrError, PaymentStatus,
    PendingTask, TaskKind, TaskPayload, TaskTrigger,
};

use crate::dispatcher::{EnqueueContext, EventDispatcher, EventHandler};

/// Template variable holding the booking start a reminder was scheduled for.
pub const VAR_START_TIME: &str = "start_time";
pub const VAR_END_TIME: &str = "end_time";

/// Register the standard fan-out for each lifecycle kind.
pub fn register_defaults(d: &mut EventDispatcher) {
    d.register(LifecycleKind::Completed, Arc::new(CalendarSyncHandler));
    d.register(LifecycleKind::Completed, Arc::new(VideoMeetingCreateHandler));
    d.register(
        LifecycleKind::Completed,
        Arc::new(ImmediateEmailHandler(TaskKind::ConfirmationEmail)),
    );
    d.register(LifecycleKind::Completed, Arc::new(ReminderEmailHandler));
    d.register(LifecycleKind::Completed, Arc::new(FollowUpEmailHandler));
    d.register(LifecycleKind::Completed, Arc::new(MessagingReminderHandler));

    d.register(LifecycleKind::Cancelled, Arc::new(VideoMeetingDeleteHandler));
    d.register(LifecycleKind::Cancelled, Arc::new(CalendarDeleteHandler));
    d.register(LifecycleKind::Cancelled, Arc::new(RefundPaymentHandler));
    d.register(
        LifecycleKind::Cancelled,
        Arc::new(ImmediateEmailHandler(TaskKind::CancellationEmail)),
    );

    d.register(LifecycleKind::Rescheduled, Arc::new(CalendarSyncHandler));
    d.register(LifecycleKind::Rescheduled, Arc::new(ReminderEmailHandler));
    d.register(LifecycleKind::Rescheduled, Arc::new(FollowUpEmailHandler));
    d.register(
        LifecycleKind::Rescheduled,
        Arc::new(ImmediateEmailHandler(TaskKind::RescheduleEmail)),
    );
}

fn base_variables(booking: &Booking) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    vars.insert("attendee_name".into(), booking.attendee_name.clone());
    vars.insert("title".into(), booking.title.clone());
    vars.insert(VAR_START_TIME.into(), format_ts(booking.start_time));
    vars.insert(VAR_END_TIME.into(), format_ts(booking.end_time));
    if let Some(url) = &booking.meeting_url {
        vars.insert("meeting_url".into(), url.clone());
    }
    vars
}

fn subject_for(kind: TaskKind, booking: &Booking) -> String {
    match kind {
        TaskKind::ConfirmationEmail => format!("Confirmed: {}", booking.title),
        TaskKind::ReminderEmail => format!("Reminder: {}", booking.title),
        TaskKind::FollowUpEmail => format!("Thanks for attending {}", booking.title),
        TaskKind::CancellationEmail => format!("Cancelled: {}", booking.title),
        TaskKind::RescheduleEmail => format!("Rescheduled: {}", booking.title),
        _ => booking.title.clone(),
    }
}

fn notification(
    kind: TaskKind,
    event: &LifecycleEvent,
    booking: &Booking,
    ctx: &EnqueueContext,
    variables: BTreeMap<String, String>,
) -> PendingTask {
    PendingTask::for_booking(
        booking,
        kind,
        TaskTrigger::from(event.kind()),
        TaskPayload::Notification {
            template: kind,
            subject: subject_for(kind, booking),
            variables,
        },
        ctx.now,
    )
    .with_max_retries(ctx.policy.max_retries)
}

/// `execute_at` for a reminder `offset` before the start, clamped to now.
/// `None` once the booking has started.
fn reminder_time(booking: &Booking, offset: Duration, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    (booking.start_time > now).then(|| (booking.start_time - offset).max(now))
}

/// Confirmation, cancellation, and reschedule notices, sent immediately.
pub struct ImmediateEmailHandler(pub TaskKind);

impl EventHandler for ImmediateEmailHandler {
    fn name(&self) -> &'static str {
        match self.0 {
            TaskKind::ConfirmationEmail => "confirmation_email",
            TaskKind::CancellationEmail => "cancellation_email",
            TaskKind::RescheduleEmail => "reschedule_email",
            _ => "immediate_email",
        }
    }

    fn handle(
        &self,
        event: &LifecycleEvent,
        booking: &Booking,
        ctx: &EnqueueContext,
    ) -> Result<Vec<PendingTask>, MeetlrError> {
        let mut vars = base_variables(booking);
        match &event.detail {
            LifecycleDetail::Cancelled {
                reason: Some(reason),
                ..
            } => {
                vars.insert("reason".into(), reason.clone());
            }
            LifecycleDetail::Rescheduled {
                old_start, old_end, ..
            } => {
                vars.insert("old_start_time".into(), format_ts(*old_start));
                vars.insert("old_end_time".into(), format_ts(*old_end));
            }
            _ => {}
        }
        Ok(vec![
            notification(self.0, event, booking, ctx, vars)
                .with_recipient(&booking.attendee_email),
        ])
    }
}

pub struct ReminderEmailHandler;

impl EventHandler for ReminderEmailHandler {
    fn name(&self) -> &'static str {
        "reminder_email"
    }

    fn handle(
        &self,
        event: &LifecycleEvent,
        booking: &Booking,
        ctx: &EnqueueContext,
    ) -> Result<Vec<PendingTask>, MeetlrError> {
        let Some(at) = reminder_time(booking, ctx.policy.reminder_offset, ctx.now) else {
            return Ok(Vec::new());
        };
        let task = notification(
            TaskKind::ReminderEmail,
            event,
            booking,
            ctx,
            base_variables(booking),
        )
        .with_recipient(&booking.attendee_email)
        .with_execute_at(at);
        Ok(vec![task])
    }
}

pub struct FollowUpEmailHandler;

impl EventHandler for FollowUpEmailHandler {
    fn name(&self) -> &'static str {
        "follow_up_email"
    }

    fn handle(
        &self,
        event: &LifecycleEvent,
        booking: &Booking,
        ctx: &EnqueueContext,
    ) -> Result<Vec<PendingTask>, MeetlrError> {
        let at = (booking.end_time + ctx.policy.follow_up_offset).max(ctx.now);
        let task = notification(
            TaskKind::FollowUpEmail,
            event,
            booking,
            ctx,
            base_variables(booking),
        )
        .with_recipient(&booking.attendee_email)
        .with_execute_at(at);
        Ok(vec![task])
    }
}

/// SMS and WhatsApp reminders for attendees who opted in with a phone number.
pub struct MessagingReminderHandler;

impl EventHandler for MessagingReminderHandler {
    fn name(&self) -> &'static str {
        "messaging_reminder"
    }

    fn handle(
        &self,
        event: &LifecycleEvent,
        booking: &Booking,
        ctx: &EnqueueContext,
    ) -> Result<Vec<PendingTask>, MeetlrError> {
        let Some(phone) = booking.attendee_phone.as_deref().filter(|p| !p.is_empty()) else {
            return Ok(Vec::new());
        };
        let Some(at) = reminder_time(booking, ctx.policy.sms_reminder_offset, ctx.now) else {
            return Ok(Vec::new());
        };

        let mut tasks = Vec::new();
        for (enabled, kind) in [
            (booking.sms_reminders, TaskKind::SmsNotification),
            (booking.whatsapp_reminders, TaskKind::WhatsAppNotification),
        ] {
            if enabled {
                tasks.push(
                    notification(kind, event, booking, ctx, base_variables(booking))
                        .with_recipient(phone)
                        .with_execute_at(at),
                );
            }
        }
        Ok(tasks)
    }
}

/// Creates the calendar event on confirmation, and replaces it after a
/// reschedule (delete the old slot, create the new one).
pub struct CalendarSyncHandler;

impl EventHandler for CalendarSyncHandler {
    fn name(&self) -> &'static str {
        "calendar_sync"
    }

    fn handle(
        &self,
        event: &LifecycleEvent,
        booking: &Booking,
        ctx: &EnqueueContext,
    ) -> Result<Vec<PendingTask>, MeetlrError> {
        let trigger = TaskTrigger::from(event.kind());
        let mut tasks = Vec::new();

        let replaced = match (&event.detail, &booking.calendar_event_id) {
            (
                LifecycleDetail::Rescheduled {
                    old_start, old_end, ..
                },
                Some(event_id),
            ) => Some((*old_start, *old_end, event_id)),
            _ => None,
        };
        if let Some((old_start, old_end, event_id)) = replaced {
            tasks.push(
                PendingTask::for_booking(
                    booking,
                    TaskKind::CalendarEventDelete,
                    trigger,
                    TaskPayload::CalendarEvent {
                        title: booking.title.clone(),
                        start: old_start,
                        end: old_end,
                        schedule_id: booking.calendar_schedule_id.clone(),
                        event_id: Some(event_id.clone()),
                    },
                    ctx.now,
                )
                .with_max_retries(ctx.policy.max_retries),
            );
        }

        if booking.auto_calendar_sync {
            let superseded = matches!(event.detail, LifecycleDetail::Rescheduled { .. });
            tasks.push(
                PendingTask::for_booking(
                    booking,
                    TaskKind::CalendarEventCreate,
                    trigger,
                    TaskPayload::CalendarEvent {
                        title: booking.title.clone(),
                        start: booking.start_time,
                        end: booking.end_time,
                        schedule_id: superseded
                            .then(|| booking.calendar_schedule_id.clone())
                            .flatten(),
                        event_id: superseded.then(|| booking.calendar_event_id.clone()).flatten(),
                    },
                    ctx.now,
                )
                .with_max_retries(ctx.policy.max_retries),
            );
        }
        Ok(tasks)
    }
}

pub struct CalendarDeleteHandler;

impl EventHandler for CalendarDeleteHandler {
    fn name(&self) -> &'static str {
        "calendar_delete"
    }

    fn handle(
        &self,
        event: &LifecycleEvent,
        booking: &Booking,
        ctx: &EnqueueContext,
    ) -> Result<Vec<PendingTask>, MeetlrError> {
        let Some(event_id) = &booking.calendar_event_id else {
            return Ok(Vec::new());
        };
        Ok(vec![
            PendingTask::for_booking(
                booking,
                TaskKind::CalendarEventDelete,
                TaskTrigger::from(event.kind()),
                TaskPayload::CalendarEvent {
                    title: booking.title.clone(),
                    start: booking.start_time,
                    end: booking.end_time,
                    schedule_id: booking.calendar_schedule_id.clone(),
                    event_id: Some(event_id.clone()),
                },
                ctx.now,
            )
            .with_max_retries(ctx.policy.max_retries),
        ])
    }
}

pub struct VideoMeetingCreateHandler;

impl EventHandler for VideoMeetingCreateHandler {
    fn name(&self) -> &'static str {
        "video_meeting_create"
    }

    fn handle(
        &self,
        event: &LifecycleEvent,
        booking: &Booking,
        ctx: &EnqueueContext,
    ) -> Result<Vec<PendingTask>, MeetlrError> {
        let Some(location_type) = &booking.location_type else {
            return Ok(Vec::new());
        };
        if booking.meeting_url.is_some() {
            return Ok(Vec::new());
        }
        Ok(vec![
            PendingTask::for_booking(
                booking,
                TaskKind::VideoMeetingCreate,
                TaskTrigger::from(event.kind()),
                TaskPayload::VideoMeeting {
                    location_type: location_type.clone(),
                    title: booking.title.clone(),
                    start: booking.start_time,
                    end: booking.end_time,
                    meeting_id: None,
                },
                ctx.now,
            )
            .with_max_retries(ctx.policy.max_retries),
        ])
    }
}

pub struct VideoMeetingDeleteHandler;

impl EventHandler for VideoMeetingDeleteHandler {
    fn name(&self) -> &'static str {
        "video_meeting_delete"
    }

    fn handle(
        &self,
        event: &LifecycleEvent,
        booking: &Booking,
        ctx: &EnqueueContext,
    ) -> Result<Vec<PendingTask>, MeetlrError> {
        let Some(meeting_id) = &booking.meeting_id else {
            return Ok(Vec::new());
        };
        Ok(vec![
            PendingTask::for_booking(
                booking,
                TaskKind::VideoMeetingDelete,
                TaskTrigger::from(event.kind()),
                TaskPayload::VideoMeeting {
                    location_type: booking.location_type.clone().unwrap_or_default(),
                    title: booking.title.clone(),
                    start: booking.start_time,
                    end: booking.end_time,
                    meeting_id: Some(meeting_id.clone()),
                },
                ctx.now,
            )
            .with_max_retries(ctx.policy.max_retries),
        ])
    }
}

pub struct RefundPaymentHandler;

impl EventHandler for RefundPaymentHandler {
    fn name(&self) -> &'static str {
        "refund_payment"
    }

    fn handle(
        &self,
        event: &LifecycleEvent,
        booking: &Booking,
        ctx: &EnqueueContext,
    ) -> Result<Vec<PendingTask>, MeetlrError> {
        let has_charge = booking
            .payment_intent_id
            .as_deref()
            .map(str::trim)
            .is_some_and(|id| !id.is_empty());
        if booking.payment_status != PaymentStatus::Completed || !has_charge {
            return Ok(Vec::new());
        }
        Ok(vec![
            PendingTask::for_booking(
                booking,
                TaskKind::RefundPayment,
                TaskTrigger::from(event.kind()),
                TaskPayload::Refund {
                    payment_intent_id: booking.payment_intent_id.clone(),
                    amount_cents: booking.price_cents,
                    currency: booking.currency.clone(),
                },
                ctx.now,
            )
            .with_max_retries(ctx.policy.max_retries),
        ])
    }
}

// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canned domain values.

use chrono::{DateTime, Duration, TimeZone, Utc};
use meetlr_core::{
    Booking, BookingStatus, PaymentStatus, PendingTask, TaskKind, TaskPayload, TaskTrigger,
};

/// The instant every fixture is anchored to: 2026-05-04 09:00 UTC.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// A free, confirmed booking starting ten days after [`base_time`].
pub fn confirmed_booking(id: &str) -> Booking {
    let now = base_time();
    let start = now + Duration::days(10);
    Booking {
        id: id.to_string(),
        tenant_id: "tenant".into(),
        meetlr_event_id: "ev".into(),
        host_user_id: "host".into(),
        title: "Consult".into(),
        attendee_name: "Ada".into(),
        attendee_email: "ada@example.com".into(),
        attendee_phone: None,
        start_time: start,
        end_time: start + Duration::hours(1),
        status: BookingStatus::Confirmed,
        price_cents: None,
        currency: "usd".into(),
        payment_status: PaymentStatus::NotRequired,
        payment_intent_id: None,
        location_type: None,
        meeting_url: None,
        meeting_id: None,
        calendar_event_id: None,
        calendar_schedule_id: None,
        auto_calendar_sync: false,
        sms_reminders: false,
        whatsapp_reminders: false,
        reschedule_count: 0,
        cancellation_reason: None,
        created_at: now,
        updated_at: now,
    }
}

/// A priced booking still waiting for its payment.
pub fn awaiting_payment_booking(id: &str, intent: &str) -> Booking {
    let mut b = confirmed_booking(id);
    b.status = BookingStatus::Pending;
    b.price_cents = Some(5000);
    b.payment_status = PaymentStatus::Pending;
    b.payment_intent_id = Some(intent.to_string());
    b
}

/// A due notification task addressed to the booking's attendee.
pub fn notification_task(booking: &Booking, kind: TaskKind, now: DateTime<Utc>) -> PendingTask {
    PendingTask::for_booking(
        booking,
        kind,
        TaskTrigger::Manual,
        TaskPayload::Notification {
            template: kind,
            subject: format!("{kind} for {}", booking.title),
            variables: Default::default(),
        },
        now,
    )
    .with_recipient(&booking.attendee_email)
}

// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Meetlr post-event task pipeline.
//!
//! This crate provides the error types, domain types, lifecycle events, and
//! collaborator traits shared by the storage, booking, tasks, and cron crates.

pub mod clock;
pub mod error;
pub mod events;
pub mod time;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use clock::{Clock, SystemClock};
pub use error::{BookingError, MeetlrError};
pub use events::{LifecycleDetail, LifecycleEvent};
pub use types::{
    AdapterType, Booking, BookingStatus, BookingUpdate, FailureCategory, FinalStatus,
    HealthStatus, LifecycleKind, PaymentStatus, PendingTask, ReservationOutcome, ServiceType,
    TaskHistory, TaskKind, TaskPayload, TaskStatus, TaskTrigger,
};

pub use traits::{
    CalendarProvider, CreditGate, MeetingProvider, NotificationSender, PaymentProvider,
    PluginAdapter,
};

#[cfg(test)]
pub(crate) fn test_booking() -> Booking {
    use chrono::TimeZone;
    let now = chrono::Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
    Booking {
        id: "b1".into(),
        tenant_id: "tenant".into(),
        meetlr_event_id: "ev".into(),
        host_user_id: "host".into(),
        title: "Intro call".into(),
        attendee_name: "Ada".into(),
        attendee_email: "ada@example.com".into(),
        attendee_phone: None,
        start_time: now + chrono::Duration::days(5),
        end_time: now + chrono::Duration::days(5) + chrono::Duration::minutes(30),
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

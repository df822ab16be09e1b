// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the booking, storage, tasks, and cron crates.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of collaborator behind a [`crate::PluginAdapter`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Notification,
    Meeting,
    Calendar,
    Payment,
    Storage,
    Observability,
}

// --- Task enums ---

/// The side effect a pending task performs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskKind {
    ConfirmationEmail,
    ReminderEmail,
    FollowUpEmail,
    CancellationEmail,
    RescheduleEmail,
    VideoMeetingCreate,
    VideoMeetingDelete,
    CalendarEventCreate,
    CalendarEventDelete,
    RefundPayment,
    SmsNotification,
    WhatsAppNotification,
    SlotInvitationEmail,
}

impl TaskKind {
    pub const ALL: [TaskKind; 13] = [
        TaskKind::ConfirmationEmail,
        TaskKind::ReminderEmail,
        TaskKind::FollowUpEmail,
        TaskKind::CancellationEmail,
        TaskKind::RescheduleEmail,
        TaskKind::VideoMeetingCreate,
        TaskKind::VideoMeetingDelete,
        TaskKind::CalendarEventCreate,
        TaskKind::CalendarEventDelete,
        TaskKind::RefundPayment,
        TaskKind::SmsNotification,
        TaskKind::WhatsAppNotification,
        TaskKind::SlotInvitationEmail,
    ];

    /// The credit-metered channel used by this kind, if any.
    ///
    /// Provider side effects (meetings, calendars, refunds) are not metered.
    pub fn metered_service(self) -> Option<ServiceType> {
        match self {
            TaskKind::ConfirmationEmail
            | TaskKind::ReminderEmail
            | TaskKind::FollowUpEmail
            | TaskKind::CancellationEmail
            | TaskKind::RescheduleEmail
            | TaskKind::SlotInvitationEmail => Some(ServiceType::Email),
            TaskKind::SmsNotification => Some(ServiceType::Sms),
            TaskKind::WhatsAppNotification => Some(ServiceType::WhatsApp),
            TaskKind::VideoMeetingCreate
            | TaskKind::VideoMeetingDelete
            | TaskKind::CalendarEventCreate
            | TaskKind::CalendarEventDelete
            | TaskKind::RefundPayment => None,
        }
    }
}

/// The lifecycle transition (or feature) that produced a pending task.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskTrigger {
    Created,
    Completed,
    Cancelled,
    Rescheduled,
    SlotInvitation,
    Manual,
}

impl From<LifecycleKind> for TaskTrigger {
    fn from(kind: LifecycleKind) -> Self {
        match kind {
            LifecycleKind::Created => TaskTrigger::Created,
            LifecycleKind::Completed => TaskTrigger::Completed,
            LifecycleKind::Cancelled => TaskTrigger::Cancelled,
            LifecycleKind::Rescheduled => TaskTrigger::Rescheduled,
        }
    }
}

/// Status of a live pending-task row.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Processing,
    Sent,
    Failed,
}

/// Terminal status recorded in task history.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FinalStatus {
    Sent,
    Failed,
}

/// Why a task ended in [`FinalStatus::Failed`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailureCategory {
    /// Retries were exhausted on a recoverable error.
    Transient,
    /// The task could never succeed (bad payload, missing booking).
    Permanent,
    /// The owning user ran out of credits; surfaced for billing follow-up.
    InsufficientCredits,
}

/// Lifecycle transitions of a booking.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LifecycleKind {
    Created,
    Completed,
    Cancelled,
    Rescheduled,
}

// --- Booking enums ---

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentStatus {
    NotRequired,
    Pending,
    Completed,
    Refunded,
    Failed,
}

/// Status reported by the payment processor for a payment intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RemotePaymentStatus {
    Pending,
    Succeeded,
    Failed,
}

// --- Credit enums ---

/// A credit-metered outbound channel.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ServiceType {
    Email,
    Sms,
    #[serde(rename = "whatsapp")]
    #[strum(serialize = "whatsapp")]
    WhatsApp,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReservationStatus {
    Reserved,
    Confirmed,
    Refunded,
}

// --- Booking aggregate ---

/// A scheduled meeting between a host and an attendee.
///
/// Transition logic lives in `meetlr-booking`; this crate only owns the shape
/// and the mutations applied by task executors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub tenant_id: String,
    pub meetlr_event_id: String,
    pub host_user_id: String,
    pub title: String,
    pub attendee_name: String,
    pub attendee_email: String,
    pub attendee_phone: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: BookingStatus,
    pub price_cents: Option<i64>,
    pub currency: String,
    pub payment_status: PaymentStatus,
    pub payment_intent_id: Option<String>,
    pub location_type: Option<String>,
    pub meeting_url: Option<String>,
    pub meeting_id: Option<String>,
    pub calendar_event_id: Option<String>,
    pub calendar_schedule_id: Option<String>,
    pub auto_calendar_sync: bool,
    pub sms_reminders: bool,
    pub whatsapp_reminders: bool,
    pub reschedule_count: u32,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// True when the booking carries a non-zero price.
    pub fn is_priced(&self) -> bool {
        self.price_cents.is_some_and(|p| p > 0)
    }

    /// Apply a mutation reported by a successful task executor.
    pub fn apply_update(&mut self, update: &BookingUpdate, now: DateTime<Utc>) {
        match update {
            BookingUpdate::SetMeeting { url, id } => {
                self.meeting_url = Some(url.clone());
                self.meeting_id = Some(id.clone());
            }
            BookingUpdate::ClearMeeting => {
                self.meeting_url = None;
                self.meeting_id = None;
            }
            BookingUpdate::SetCalendarEvent {
                schedule_id,
                event_id,
            } => {
                self.calendar_schedule_id = Some(schedule_id.clone());
                self.calendar_event_id = Some(event_id.clone());
            }
            BookingUpdate::ClearCalendarEvent => {
                self.calendar_schedule_id = None;
                self.calendar_event_id = None;
            }
            BookingUpdate::MarkRefunded => {
                self.payment_status = PaymentStatus::Refunded;
            }
        }
        self.updated_at = now;
    }
}

/// A booking mutation produced by a task executor.
///
/// Applied in the same transaction that archives the task as sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BookingUpdate {
    SetMeeting { url: String, id: String },
    ClearMeeting,
    SetCalendarEvent { schedule_id: String, event_id: String },
    ClearCalendarEvent,
    MarkRefunded,
}

// --- Pending tasks ---

/// Kind-specific task parameters, persisted as JSON in `payload_json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskPayload {
    /// Email, SMS, and WhatsApp messages.
    Notification {
        template: TaskKind,
        subject: String,
        #[serde(default)]
        variables: BTreeMap<String, String>,
    },
    VideoMeeting {
        location_type: String,
        title: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        #[serde(default)]
        meeting_id: Option<String>,
    },
    /// For deletes, `schedule_id`/`event_id` name the event to remove. For
    /// creates they name the event being superseded (after a reschedule).
    CalendarEvent {
        title: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        #[serde(default)]
        schedule_id: Option<String>,
        #[serde(default)]
        event_id: Option<String>,
    },
    Refund {
        payment_intent_id: Option<String>,
        amount_cents: Option<i64>,
        currency: String,
    },
}

/// A durable record of deferred work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingTask {
    pub id: String,
    pub tenant_id: String,
    pub booking_id: Option<String>,
    pub meetlr_event_id: String,
    pub user_id: String,
    pub kind: TaskKind,
    pub trigger: TaskTrigger,
    pub payload: TaskPayload,
    pub recipient: Option<String>,
    pub status: TaskStatus,
    pub scheduled_at: DateTime<Utc>,
    pub execute_at: DateTime<Utc>,
    pub processing_started_at: Option<DateTime<Utc>>,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub retry_count: u32,
    pub max_retries: u32,
    pub error_message: Option<String>,
    pub error_details: Option<String>,
    pub external_message_id: Option<String>,
}

pub const DEFAULT_MAX_RETRIES: u32 = 3;

impl PendingTask {
    /// A fresh queued task for `booking`, due immediately.
    pub fn for_booking(
        booking: &Booking,
        kind: TaskKind,
        trigger: TaskTrigger,
        payload: TaskPayload,
        now: DateTime<Utc>,
    ) -> Self {
        Self::new(
            &booking.tenant_id,
            Some(&booking.id),
            &booking.meetlr_event_id,
            &booking.host_user_id,
            kind,
            trigger,
            payload,
            now,
        )
    }

    /// A fresh queued task, due immediately. `booking_id` is `None` for work
    /// that precedes any booking (slot invitations).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tenant_id: &str,
        booking_id: Option<&str>,
        meetlr_event_id: &str,
        user_id: &str,
        kind: TaskKind,
        trigger: TaskTrigger,
        payload: TaskPayload,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            booking_id: booking_id.map(str::to_string),
            meetlr_event_id: meetlr_event_id.to_string(),
            user_id: user_id.to_string(),
            kind,
            trigger,
            payload,
            recipient: None,
            status: TaskStatus::Queued,
            scheduled_at: now,
            execute_at: now,
            processing_started_at: None,
            next_retry_at: None,
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            error_message: None,
            error_details: None,
            external_message_id: None,
        }
    }

    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    pub fn with_execute_at(mut self, execute_at: DateTime<Utc>) -> Self {
        self.execute_at = execute_at;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Whether the poller may claim this row at `now`.
    ///
    /// Mirrors the claim query in `meetlr-storage`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        let status_ok = match self.status {
            TaskStatus::Queued => true,
            TaskStatus::Failed => self.next_retry_at.is_none_or(|t| now >= t),
            TaskStatus::Processing | TaskStatus::Sent => false,
        };
        status_ok && now >= self.execute_at && self.retry_count < self.max_retries
    }
}

/// Immutable audit record of a task's terminal outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskHistory {
    pub id: String,
    pub tenant_id: String,
    pub booking_id: Option<String>,
    pub meetlr_event_id: String,
    pub user_id: String,
    pub kind: TaskKind,
    pub trigger: TaskTrigger,
    pub payload: TaskPayload,
    pub recipient: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub execute_at: DateTime<Utc>,
    pub retry_count: u32,
    pub max_retries: u32,
    pub error_message: Option<String>,
    pub error_details: Option<String>,
    pub external_message_id: Option<String>,
    pub final_status: FinalStatus,
    pub failure_category: Option<FailureCategory>,
    pub processed_at: DateTime<Utc>,
    pub processing_time_ms: i64,
}

// --- Credits ---

/// Result of a credit reservation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationOutcome {
    /// Credits are held (or were already held) for this entity.
    pub success: bool,
    /// A reservation for this entity already existed before the call.
    pub already_charged: bool,
    /// The existing reservation was already confirmed; do not send again.
    pub already_sent: bool,
}

impl ReservationOutcome {
    pub const RESERVED: Self = Self {
        success: true,
        already_charged: false,
        already_sent: false,
    };
    pub const INSUFFICIENT: Self = Self {
        success: false,
        already_charged: false,
        already_sent: false,
    };
}

/// A persisted credit hold keyed by the entity it pays for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditReservation {
    pub id: String,
    pub user_id: String,
    pub service_type: ServiceType,
    pub related_entity_id: String,
    pub credits: i64,
    pub status: ReservationStatus,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Collaborator request/response shapes ---

/// A rendered message handed to a [`crate::NotificationSender`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundNotification {
    pub service: ServiceType,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    /// Stable id for de-duplication by the transport (the pending task id).
    pub idempotency_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    pub external_message_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingRequest {
    pub plugin_id: String,
    pub user_id: String,
    pub booking_id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingInfo {
    pub meeting_id: String,
    pub join_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEventRequest {
    pub user_id: String,
    pub booking_id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub attendee_email: String,
}

/// Outcome of creating an event on one connected calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarResult {
    pub provider: String,
    pub success: bool,
    pub schedule_id: Option<String>,
    pub event_id: Option<String>,
    pub error: Option<String>,
}

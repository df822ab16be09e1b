// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Email, SMS, and WhatsApp delivery behind the credit gate.
//!
//! Credits are reserved under the task id before sending and confirmed after
//! the sender accepts the message. A retry of the same task finds the
//! reservation already held and does not debit again; a task whose
//! reservation is already confirmed is not sent again.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use meetlr_config::model::CreditsConfig;
use meetlr_core::time::format_ts;
use meetlr_core::types::OutboundNotification;
use meetlr_core::{
    Booking, BookingStatus, CreditGate, MeetlrError, NotificationSender, PendingTask, ServiceType,
    TaskKind, TaskPayload,
};
use meetlr_credits::credit_cost;
use tracing::{debug, warn};

use crate::executor::{ExecutionError, ExecutionOutcome, TaskExecutor};
use crate::executors::payload_mismatch;
use crate::templates::render_body;

pub const NOTIFICATION_KINDS: &[TaskKind] = &[
    TaskKind::ConfirmationEmail,
    TaskKind::ReminderEmail,
    TaskKind::FollowUpEmail,
    TaskKind::CancellationEmail,
    TaskKind::RescheduleEmail,
    TaskKind::SmsNotification,
    TaskKind::WhatsAppNotification,
    TaskKind::SlotInvitationEmail,
];

pub struct NotificationExecutor {
    senders: HashMap<ServiceType, Arc<dyn NotificationSender>>,
    credits: Arc<dyn CreditGate>,
    costs: CreditsConfig,
}

impl NotificationExecutor {
    pub fn new(credits: Arc<dyn CreditGate>, costs: CreditsConfig) -> Self {
        Self {
            senders: HashMap::new(),
            credits,
            costs,
        }
    }

    /// Route the sender's channel to it.
    pub fn with_sender(mut self, sender: Arc<dyn NotificationSender>) -> Self {
        self.senders.insert(sender.service(), sender);
        self
    }
}

/// Why a notification no longer applies to the booking as it stands now.
fn stale_reason(task: &PendingTask, booking: Option<&Booking>) -> Option<String> {
    let booking = booking?;
    let cancelled = booking.status == BookingStatus::Cancelled;
    match task.kind {
        TaskKind::CancellationEmail if !cancelled => {
            return Some("booking is not cancelled".into());
        }
        TaskKind::CancellationEmail | TaskKind::SlotInvitationEmail => return None,
        _ if cancelled => return Some("booking cancelled".into()),
        _ => {}
    }

    let timed = matches!(
        task.kind,
        TaskKind::ReminderEmail
            | TaskKind::FollowUpEmail
            | TaskKind::SmsNotification
            | TaskKind::WhatsAppNotification
    );
    if !timed {
        return None;
    }
    let TaskPayload::Notification { variables, .. } = &task.payload else {
        return None;
    };
    let moved = |key: &str, current: DateTime<Utc>| variables.get(key).is_some_and(|v| *v != format_ts(current));
    (moved("start_time", booking.start_time) || moved("end_time", booking.end_time))
        .then(|| "superseded by reschedule".to_string())
}

#[async_trait]
impl TaskExecutor for NotificationExecutor {
    fn name(&self) -> &'static str {
        "notification"
    }

    fn kinds(&self) -> &'static [TaskKind] {
        NOTIFICATION_KINDS
    }

    async fn execute(
        &self,
        task: &PendingTask,
        booking: Option<&Booking>,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        let service = task.kind.metered_service().ok_or_else(|| {
            ExecutionError::permanent(format!("{} is not a notification kind", task.kind))
        })?;
        let TaskPayload::Notification {
            template,
            subject,
            variables,
        } = &task.payload
        else {
            return Err(payload_mismatch(task));
        };
        let recipient = task
            .recipient
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| ExecutionError::permanent("notification has no recipient"))?;

        if let Some(reason) = stale_reason(task, booking) {
            debug!(task_id = %task.id, kind = %task.kind, reason = %reason, "notification no longer applies");
            return Ok(ExecutionOutcome::skipped(reason));
        }

        let sender = self
            .senders
            .get(&service)
            .ok_or_else(|| ExecutionError::permanent(format!("no sender for {service}")))?;

        let cost = credit_cost(service, &self.costs);
        let reservation = self
            .credits
            .reserve_credits(
                &task.user_id,
                service,
                &task.id,
                cost,
                &format!("{} {}", task.kind, task.id),
            )
            .await?;

        #[cfg(feature = "prometheus")]
        meetlr_prometheus::record_credit_reservation(
            &service.to_string(),
            match (reservation.success, reservation.already_sent) {
                (false, _) => "insufficient",
                (true, true) => "already_sent",
                (true, false) => "reserved",
            },
        );

        if !reservation.success {
            return Err(ExecutionError::InsufficientCredits {
                service,
                required: cost,
            });
        }
        if reservation.already_sent {
            return Ok(ExecutionOutcome::skipped("already sent"));
        }

        let receipt = sender
            .send(OutboundNotification {
                service,
                recipient: recipient.to_string(),
                subject: subject.clone(),
                body: render_body(*template, variables),
                idempotency_key: task.id.clone(),
            })
            .await?;

        if let Err(e) = self.credits.confirm_credits_used(&task.id).await {
            warn!(task_id = %task.id, error = %e, "message sent but reservation not confirmed");
        }
        Ok(ExecutionOutcome::sent(receipt.external_message_id))
    }

    async fn on_terminal_failure(&self, task: &PendingTask) -> Result<(), MeetlrError> {
        if self.credits.refund_credits(&task.id).await? {
            debug!(task_id = %task.id, "reserved credits refunded");
        }
        Ok(())
    }
}

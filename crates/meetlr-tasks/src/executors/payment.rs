// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Refunds for cancelled paid bookings.

use std::sync::Arc;

use async_trait::async_trait;
use meetlr_core::{
    Booking, BookingUpdate, PaymentProvider, PaymentStatus, PendingTask, TaskKind, TaskPayload,
};
use tracing::debug;

use crate::executor::{ExecutionError, ExecutionOutcome, TaskExecutor};
use crate::executors::payload_mismatch;

pub struct RefundPaymentExecutor {
    provider: Arc<dyn PaymentProvider>,
}

impl RefundPaymentExecutor {
    pub fn new(provider: Arc<dyn PaymentProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl TaskExecutor for RefundPaymentExecutor {
    fn name(&self) -> &'static str {
        "refund_payment"
    }

    fn kinds(&self) -> &'static [TaskKind] {
        &[TaskKind::RefundPayment]
    }

    async fn execute(
        &self,
        task: &PendingTask,
        booking: Option<&Booking>,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        let TaskPayload::Refund {
            payment_intent_id,
            amount_cents,
            ..
        } = &task.payload
        else {
            return Err(payload_mismatch(task));
        };
        let intent = payment_intent_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ExecutionError::permanent("refund has no payment intent id"))?;

        if booking.is_some_and(|b| b.payment_status == PaymentStatus::Refunded) {
            debug!(task_id = %task.id, "payment already refunded");
            return Ok(ExecutionOutcome::done());
        }

        if !self.provider.refund_payment(intent, *amount_cents).await? {
            return Err(ExecutionError::transient(format!(
                "processor declined refund for {intent}"
            )));
        }
        Ok(ExecutionOutcome::with_update(BookingUpdate::MarkRefunded).external_id(intent))
    }
}

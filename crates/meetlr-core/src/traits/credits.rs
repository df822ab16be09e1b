// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credit reservation gate for metered notifications.

use async_trait::async_trait;

use crate::error::MeetlrError;
use crate::types::{ReservationOutcome, ServiceType};

/// Two-phase credit accounting keyed by the entity being paid for.
///
/// `reserve_credits` is idempotent on `related_entity_id`: repeated calls
/// for the same id debit at most once.
#[async_trait]
pub trait CreditGate: Send + Sync {
    async fn reserve_credits(
        &self,
        user_id: &str,
        service: ServiceType,
        related_entity_id: &str,
        credits: i64,
        description: &str,
    ) -> Result<ReservationOutcome, MeetlrError>;

    /// Marks a reservation as consumed. Returns `false` if nothing was reserved.
    async fn confirm_credits_used(&self, related_entity_id: &str) -> Result<bool, MeetlrError>;

    /// Returns reserved credits to the balance. Returns `false` if nothing was refunded.
    async fn refund_credits(&self, related_entity_id: &str) -> Result<bool, MeetlrError>;
}

// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payment processor operations used by refunds and reconciliation.

use async_trait::async_trait;

use crate::error::MeetlrError;
use crate::traits::adapter::PluginAdapter;
use crate::types::RemotePaymentStatus;

#[async_trait]
pub trait PaymentProvider: PluginAdapter {
    /// Refunds `amount_cents`, or the full amount when `None`.
    async fn refund_payment(
        &self,
        payment_intent_id: &str,
        amount_cents: Option<i64>,
    ) -> Result<bool, MeetlrError>;

    async fn payment_status(
        &self,
        payment_intent_id: &str,
    ) -> Result<RemotePaymentStatus, MeetlrError>;
}

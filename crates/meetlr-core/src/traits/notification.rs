// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound notification transport (email relay, SMS gateway, WhatsApp).

use async_trait::async_trait;

use crate::error::MeetlrError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{OutboundNotification, SendReceipt, ServiceType};

/// Delivers a rendered message over one channel.
///
/// Implementations should treat `idempotency_key` as a de-duplication hint
/// where the transport supports one.
#[async_trait]
pub trait NotificationSender: PluginAdapter {
    /// The channel this sender delivers on.
    fn service(&self) -> ServiceType;

    async fn send(&self, notification: OutboundNotification) -> Result<SendReceipt, MeetlrError>;
}

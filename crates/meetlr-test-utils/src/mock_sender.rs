// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock notification sender for deterministic testing.
//!
//! `MockSender` records every delivered message and can be scripted to fail
//! the next N sends, or every send, with a provider error.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use meetlr_core::types::{OutboundNotification, SendReceipt};
use meetlr_core::{AdapterType, HealthStatus, MeetlrError, NotificationSender, PluginAdapter, ServiceType};

#[derive(Default)]
struct State {
    sent: Vec<OutboundNotification>,
    fail_next: u32,
    fail_always: bool,
    attempts: u32,
}

pub struct MockSender {
    service: ServiceType,
    state: Arc<Mutex<State>>,
}

impl MockSender {
    pub fn new(service: ServiceType) -> Self {
        Self {
            service,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    pub fn email() -> Self {
        Self::new(ServiceType::Email)
    }

    /// Fail the next `n` sends.
    pub async fn fail_next(&self, n: u32) {
        self.state.lock().await.fail_next = n;
    }

    pub async fn fail_always(&self) {
        self.state.lock().await.fail_always = true;
    }

    /// Messages delivered so far.
    pub async fn sent(&self) -> Vec<OutboundNotification> {
        self.state.lock().await.sent.clone()
    }

    /// Send attempts, including failed ones.
    pub async fn attempts(&self) -> u32 {
        self.state.lock().await.attempts
    }
}

#[async_trait]
impl PluginAdapter for MockSender {
    fn name(&self) -> &str {
        "mock-sender"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Notification
    }

    async fn health_check(&self) -> Result<HealthStatus, MeetlrError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MeetlrError> {
        Ok(())
    }
}

#[async_trait]
impl NotificationSender for MockSender {
    fn service(&self) -> ServiceType {
        self.service
    }

    async fn send(&self, notification: OutboundNotification) -> Result<SendReceipt, MeetlrError> {
        let mut state = self.state.lock().await;
        state.attempts += 1;
        if state.fail_always {
            return Err(MeetlrError::provider("mock sender unavailable"));
        }
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(MeetlrError::provider("mock sender transient failure"));
        }
        let id = format!("msg-{}", state.sent.len() + 1);
        state.sent.push(notification);
        Ok(SendReceipt {
            external_message_id: Some(id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> OutboundNotification {
        OutboundNotification {
            service: ServiceType::Email,
            recipient: "ada@example.com".into(),
            subject: "Hi".into(),
            body: "Hello".into(),
            idempotency_key: "t1".into(),
        }
    }

    #[tokio::test]
    async fn scripted_failures_then_success() {
        let sender = MockSender::email();
        sender.fail_next(1).await;
        assert!(sender.send(message()).await.is_err());
        let receipt = sender.send(message()).await.unwrap();
        assert_eq!(receipt.external_message_id.as_deref(), Some("msg-1"));
        assert_eq!(sender.attempts().await, 2);
        assert_eq!(sender.sent().await.len(), 1);
    }
}

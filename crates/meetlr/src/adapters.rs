// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound collaborator adapters.
//!
//! [`LogAdapter`] only logs each call and answers with synthetic ids (dry
//! run). [`WebhookAdapter`] forwards each call as a JSON POST to
//! `{webhook_base_url}/{operation}`: a 2xx answer is success, a 4xx answer
//! is a refusal, and anything else is a provider error.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use meetlr_config::model::{ProviderMode, ProvidersConfig};
use meetlr_core::types::{
    CalendarEventRequest, CalendarResult, MeetingInfo, MeetingRequest, OutboundNotification,
    RemotePaymentStatus, SendReceipt,
};
use meetlr_core::{
    AdapterType, CalendarProvider, HealthStatus, MeetingProvider, MeetlrError,
    NotificationSender, PaymentProvider, PluginAdapter, ServiceType,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info};

/// The outbound collaborators one process talks to.
pub struct Providers {
    pub senders: Vec<Arc<dyn NotificationSender>>,
    pub meetings: Arc<dyn MeetingProvider>,
    pub calendars: Arc<dyn CalendarProvider>,
    pub payments: Arc<dyn PaymentProvider>,
}

impl Providers {
    pub fn from_config(config: &ProvidersConfig) -> Result<Self, MeetlrError> {
        match config.mode {
            ProviderMode::Log => {
                let shared = Arc::new(LogAdapter::new(ServiceType::Email));
                Ok(Self {
                    senders: vec![
                        shared.clone(),
                        Arc::new(LogAdapter::new(ServiceType::Sms)),
                        Arc::new(LogAdapter::new(ServiceType::WhatsApp)),
                    ],
                    meetings: shared.clone(),
                    calendars: shared.clone(),
                    payments: shared,
                })
            }
            ProviderMode::Webhook => {
                let base_url = config.webhook_base_url.clone().ok_or_else(|| {
                    MeetlrError::Config("providers.webhook_base_url is not set".into())
                })?;
                let timeout = Duration::from_secs(config.request_timeout_secs);
                let shared = Arc::new(WebhookAdapter::new(&base_url, ServiceType::Email, timeout)?);
                Ok(Self {
                    senders: vec![
                        shared.clone(),
                        Arc::new(WebhookAdapter::new(&base_url, ServiceType::Sms, timeout)?),
                        Arc::new(WebhookAdapter::new(&base_url, ServiceType::WhatsApp, timeout)?),
                    ],
                    meetings: shared.clone(),
                    calendars: shared.clone(),
                    payments: shared,
                })
            }
        }
    }
}

// --- Log ---

pub struct LogAdapter {
    service: ServiceType,
    seq: AtomicU64,
}

impl LogAdapter {
    pub fn new(service: ServiceType) -> Self {
        Self {
            service,
            seq: AtomicU64::new(0),
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("log-{prefix}-{}", self.seq.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

#[async_trait]
impl PluginAdapter for LogAdapter {
    fn name(&self) -> &str {
        "log"
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
impl NotificationSender for LogAdapter {
    fn service(&self) -> ServiceType {
        self.service
    }

    async fn send(&self, n: OutboundNotification) -> Result<SendReceipt, MeetlrError> {
        info!(
            service = %n.service,
            recipient = %n.recipient,
            subject = %n.subject,
            idempotency_key = %n.idempotency_key,
            "notification (dry run)"
        );
        Ok(SendReceipt {
            external_message_id: Some(self.next_id("msg")),
        })
    }
}

#[async_trait]
impl MeetingProvider for LogAdapter {
    async fn create_meeting(&self, request: MeetingRequest) -> Result<MeetingInfo, MeetlrError> {
        let meeting_id = self.next_id(&request.plugin_id);
        info!(booking_id = %request.booking_id, plugin = %request.plugin_id, %meeting_id, "create meeting (dry run)");
        Ok(MeetingInfo {
            join_url: format!("https://meet.invalid/{meeting_id}"),
            meeting_id,
        })
    }

    async fn delete_meeting(&self, meeting_id: &str, user_id: &str) -> Result<bool, MeetlrError> {
        info!(meeting_id, user_id, "delete meeting (dry run)");
        Ok(true)
    }
}

#[async_trait]
impl CalendarProvider for LogAdapter {
    async fn create_event(
        &self,
        request: CalendarEventRequest,
    ) -> Result<Vec<CalendarResult>, MeetlrError> {
        info!(booking_id = %request.booking_id, start = %request.start, "create calendar event (dry run)");
        Ok(vec![CalendarResult {
            provider: "log".into(),
            success: true,
            schedule_id: Some(self.next_id("sched")),
            event_id: Some(self.next_id("evt")),
            error: None,
        }])
    }

    async fn delete_event(&self, schedule_id: &str, event_id: &str) -> Result<bool, MeetlrError> {
        info!(schedule_id, event_id, "delete calendar event (dry run)");
        Ok(true)
    }
}

#[async_trait]
impl PaymentProvider for LogAdapter {
    async fn refund_payment(
        &self,
        payment_intent_id: &str,
        amount_cents: Option<i64>,
    ) -> Result<bool, MeetlrError> {
        info!(payment_intent_id, ?amount_cents, "refund (dry run)");
        Ok(true)
    }

    /// Nothing settles in dry-run mode.
    async fn payment_status(
        &self,
        payment_intent_id: &str,
    ) -> Result<RemotePaymentStatus, MeetlrError> {
        debug!(payment_intent_id, "payment status (dry run)");
        Ok(RemotePaymentStatus::Pending)
    }
}

// --- Webhook ---

pub struct WebhookAdapter {
    client: reqwest::Client,
    base_url: String,
    service: ServiceType,
    timeout: Duration,
}

#[derive(Deserialize)]
struct SendResponse {
    #[serde(default)]
    message_id: Option<String>,
}

#[derive(Deserialize)]
struct StatusResponse {
    status: RemotePaymentStatus,
}

impl WebhookAdapter {
    pub fn new(base_url: &str, service: ServiceType, timeout: Duration) -> Result<Self, MeetlrError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MeetlrError::Provider {
                message: "failed to build webhook HTTP client".into(),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service,
            timeout,
        })
    }

    async fn post(
        &self,
        operation: &str,
        body: serde_json::Value,
    ) -> Result<reqwest::Response, MeetlrError> {
        let url = format!("{}/{operation}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MeetlrError::Timeout {
                        duration: self.timeout,
                    }
                } else {
                    MeetlrError::Provider {
                        message: format!("webhook {operation} request failed"),
                        source: Some(Box::new(e)),
                    }
                }
            })?;
        debug!(operation, status = %response.status(), "webhook answered");
        Ok(response)
    }

    /// `true` on 2xx, `false` on 4xx, an error otherwise.
    async fn post_accepted(
        &self,
        operation: &str,
        body: serde_json::Value,
    ) -> Result<bool, MeetlrError> {
        let response = self.post(operation, body).await?;
        let status = response.status();
        if status.is_success() {
            Ok(true)
        } else if status.is_client_error() {
            Ok(false)
        } else {
            Err(MeetlrError::provider(format!("webhook {operation} returned {status}")))
        }
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        body: serde_json::Value,
    ) -> Result<T, MeetlrError> {
        let response = self.post(operation, body).await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(MeetlrError::provider(format!(
                "webhook {operation} returned {status}: {text}"
            )));
        }
        response.json::<T>().await.map_err(|e| MeetlrError::Provider {
            message: format!("webhook {operation} returned an unreadable body"),
            source: Some(Box::new(e)),
        })
    }
}

#[async_trait]
impl PluginAdapter for WebhookAdapter {
    fn name(&self) -> &str {
        "webhook"
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
impl NotificationSender for WebhookAdapter {
    fn service(&self) -> ServiceType {
        self.service
    }

    async fn send(&self, n: OutboundNotification) -> Result<SendReceipt, MeetlrError> {
        let operation = format!("notifications/{}", self.service);
        let body = serde_json::to_value(&n)?;
        let response: SendResponse = self.post_json(&operation, body).await?;
        Ok(SendReceipt {
            external_message_id: response.message_id,
        })
    }
}

#[async_trait]
impl MeetingProvider for WebhookAdapter {
    async fn create_meeting(&self, request: MeetingRequest) -> Result<MeetingInfo, MeetlrError> {
        self.post_json("meetings/create", serde_json::to_value(&request)?)
            .await
    }

    async fn delete_meeting(&self, meeting_id: &str, user_id: &str) -> Result<bool, MeetlrError> {
        self.post_accepted(
            "meetings/delete",
            json!({ "meeting_id": meeting_id, "user_id": user_id }),
        )
        .await
    }
}

#[async_trait]
impl CalendarProvider for WebhookAdapter {
    async fn create_event(
        &self,
        request: CalendarEventRequest,
    ) -> Result<Vec<CalendarResult>, MeetlrError> {
        self.post_json("calendar/create", serde_json::to_value(&request)?)
            .await
    }

    async fn delete_event(&self, schedule_id: &str, event_id: &str) -> Result<bool, MeetlrError> {
        self.post_accepted(
            "calendar/delete",
            json!({ "schedule_id": schedule_id, "event_id": event_id }),
        )
        .await
    }
}

#[async_trait]
impl PaymentProvider for WebhookAdapter {
    async fn refund_payment(
        &self,
        payment_intent_id: &str,
        amount_cents: Option<i64>,
    ) -> Result<bool, MeetlrError> {
        self.post_accepted(
            "payments/refund",
            json!({ "payment_intent_id": payment_intent_id, "amount_cents": amount_cents }),
        )
        .await
    }

    async fn payment_status(
        &self,
        payment_intent_id: &str,
    ) -> Result<RemotePaymentStatus, MeetlrError> {
        let response: StatusResponse = self
            .post_json(
                "payments/status",
                json!({ "payment_intent_id": payment_intent_id }),
            )
            .await?;
        Ok(response.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tracing_test::traced_test;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter(server: &MockServer) -> WebhookAdapter {
        WebhookAdapter::new(&server.uri(), ServiceType::Email, Duration::from_secs(2)).unwrap()
    }

    fn notification() -> OutboundNotification {
        OutboundNotification {
            service: ServiceType::Email,
            recipient: "ada@example.com".into(),
            subject: "Confirmed: Consult".into(),
            body: "See you soon".into(),
            idempotency_key: "task-1".into(),
        }
    }

    #[tokio::test]
    async fn send_posts_notification_and_reads_message_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/notifications/email"))
            .and(body_partial_json(json!({ "idempotency_key": "task-1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message_id": "m-42" })))
            .expect(1)
            .mount(&server)
            .await;

        let receipt = adapter(&server).send(notification()).await.unwrap();
        assert_eq!(receipt.external_message_id.as_deref(), Some("m-42"));
    }

    #[tokio::test]
    async fn server_error_is_a_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = adapter(&server).send(notification()).await.unwrap_err();
        assert!(matches!(err, MeetlrError::Provider { .. }));
    }

    #[tokio::test]
    async fn client_error_is_a_refusal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/payments/refund"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/meetings/delete"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let a = adapter(&server);
        assert!(!a.refund_payment("pi_1", Some(500)).await.unwrap());
        assert!(a.delete_meeting("zoom-1", "host").await.unwrap());
    }

    #[tokio::test]
    async fn meeting_and_status_bodies_are_decoded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/meetings/create"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "meeting_id": "zoom-7",
                "join_url": "https://zoom.example/j/7"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/payments/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "succeeded" })))
            .mount(&server)
            .await;

        let a = adapter(&server);
        let start = Utc.with_ymd_and_hms(2026, 5, 14, 9, 0, 0).unwrap();
        let info = a
            .create_meeting(MeetingRequest {
                plugin_id: "zoom".into(),
                user_id: "host".into(),
                booking_id: "b1".into(),
                title: "Consult".into(),
                start,
                end: start + chrono::Duration::hours(1),
            })
            .await
            .unwrap();
        assert_eq!(info.meeting_id, "zoom-7");
        assert_eq!(
            a.payment_status("pi_1").await.unwrap(),
            RemotePaymentStatus::Succeeded
        );
    }

    #[tokio::test]
    async fn slow_webhook_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;
        let a = WebhookAdapter::new(&server.uri(), ServiceType::Sms, Duration::from_millis(50))
            .unwrap();
        let err = a.delete_event("s", "e").await.unwrap_err();
        assert!(matches!(err, MeetlrError::Timeout { .. }));
    }

    #[tokio::test]
    async fn log_mode_builds_every_collaborator() {
        let providers = Providers::from_config(&ProvidersConfig::default()).unwrap();
        let services: Vec<_> = providers.senders.iter().map(|s| s.service()).collect();
        assert_eq!(
            services,
            vec![ServiceType::Email, ServiceType::Sms, ServiceType::WhatsApp]
        );
        let receipt = providers.senders[0].send(notification()).await.unwrap();
        assert_eq!(receipt.external_message_id.as_deref(), Some("log-msg-1"));
        assert_eq!(
            providers.payments.payment_status("pi").await.unwrap(),
            RemotePaymentStatus::Pending
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn log_adapter_records_dry_run_sends() {
        let adapter = LogAdapter::new(ServiceType::Email);
        adapter.send(notification()).await.unwrap();
        assert!(adapter.delete_meeting("zoom-1", "host").await.unwrap());
        assert!(logs_contain("notification (dry run)"));
        assert!(logs_contain("delete meeting (dry run)"));
    }
}

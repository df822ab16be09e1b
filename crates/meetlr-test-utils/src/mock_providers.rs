// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted meeting, calendar, and payment providers.
//!
//! Each mock records the calls it received so tests can assert that an
//! executor did (or did not) reach the provider.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use meetlr_core::types::{
    CalendarEventRequest, CalendarResult, MeetingInfo, MeetingRequest, RemotePaymentStatus,
};
use meetlr_core::{
    AdapterType, CalendarProvider, HealthStatus, MeetingProvider, MeetlrError, PaymentProvider,
    PluginAdapter,
};

macro_rules! mock_adapter {
    ($ty:ty, $name:literal, $kind:expr) => {
        #[async_trait]
        impl PluginAdapter for $ty {
            fn name(&self) -> &str {
                $name
            }

            fn version(&self) -> semver::Version {
                semver::Version::new(0, 1, 0)
            }

            fn adapter_type(&self) -> AdapterType {
                $kind
            }

            async fn health_check(&self) -> Result<HealthStatus, MeetlrError> {
                Ok(HealthStatus::Healthy)
            }

            async fn shutdown(&self) -> Result<(), MeetlrError> {
                Ok(())
            }
        }
    };
}

// --- Meetings ---

struct MeetingState {
    created: Vec<MeetingRequest>,
    deleted: Vec<(String, String)>,
    fail_create_next: u32,
    delete_result: bool,
}

pub struct MockMeetingProvider {
    state: Arc<Mutex<MeetingState>>,
}

impl MockMeetingProvider {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MeetingState {
                created: Vec::new(),
                deleted: Vec::new(),
                fail_create_next: 0,
                delete_result: true,
            })),
        }
    }

    pub async fn fail_create_next(&self, n: u32) {
        self.state.lock().await.fail_create_next = n;
    }

    /// Make the provider refuse deletions.
    pub async fn refuse_deletes(&self) {
        self.state.lock().await.delete_result = false;
    }

    pub async fn created(&self) -> Vec<MeetingRequest> {
        self.state.lock().await.created.clone()
    }

    pub async fn deleted(&self) -> Vec<(String, String)> {
        self.state.lock().await.deleted.clone()
    }
}

impl Default for MockMeetingProvider {
    fn default() -> Self {
        Self::new()
    }
}

mock_adapter!(MockMeetingProvider, "mock-meeting", AdapterType::Meeting);

#[async_trait]
impl MeetingProvider for MockMeetingProvider {
    async fn create_meeting(&self, request: MeetingRequest) -> Result<MeetingInfo, MeetlrError> {
        let mut state = self.state.lock().await;
        if state.fail_create_next > 0 {
            state.fail_create_next -= 1;
            return Err(MeetlrError::provider("mock meeting provider unavailable"));
        }
        let n = state.created.len() + 1;
        let info = MeetingInfo {
            meeting_id: format!("{}-{n}", request.plugin_id),
            join_url: format!("https://meet.example/{}/{n}", request.plugin_id),
        };
        state.created.push(request);
        Ok(info)
    }

    async fn delete_meeting(&self, meeting_id: &str, user_id: &str) -> Result<bool, MeetlrError> {
        let mut state = self.state.lock().await;
        state
            .deleted
            .push((meeting_id.to_string(), user_id.to_string()));
        Ok(state.delete_result)
    }
}

// --- Calendars ---

struct CalendarState {
    created: Vec<CalendarEventRequest>,
    deleted: Vec<(String, String)>,
    all_fail: bool,
    delete_result: bool,
}

pub struct MockCalendarProvider {
    state: Arc<Mutex<CalendarState>>,
}

impl MockCalendarProvider {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(CalendarState {
                created: Vec::new(),
                deleted: Vec::new(),
                all_fail: false,
                delete_result: true,
            })),
        }
    }

    /// Every connected calendar reports failure on create.
    pub async fn fail_all_creates(&self) {
        self.state.lock().await.all_fail = true;
    }

    pub async fn refuse_deletes(&self) {
        self.state.lock().await.delete_result = false;
    }

    pub async fn created(&self) -> Vec<CalendarEventRequest> {
        self.state.lock().await.created.clone()
    }

    pub async fn deleted(&self) -> Vec<(String, String)> {
        self.state.lock().await.deleted.clone()
    }
}

impl Default for MockCalendarProvider {
    fn default() -> Self {
        Self::new()
    }
}

mock_adapter!(MockCalendarProvider, "mock-calendar", AdapterType::Calendar);

#[async_trait]
impl CalendarProvider for MockCalendarProvider {
    async fn create_event(
        &self,
        request: CalendarEventRequest,
    ) -> Result<Vec<CalendarResult>, MeetlrError> {
        let mut state = self.state.lock().await;
        state.created.push(request);
        let n = state.created.len();
        let result = if state.all_fail {
            CalendarResult {
                provider: "mock".into(),
                success: false,
                schedule_id: None,
                event_id: None,
                error: Some("calendar rejected event".into()),
            }
        } else {
            CalendarResult {
                provider: "mock".into(),
                success: true,
                schedule_id: Some(format!("sched-{n}")),
                event_id: Some(format!("evt-{n}")),
                error: None,
            }
        };
        Ok(vec![result])
    }

    async fn delete_event(&self, schedule_id: &str, event_id: &str) -> Result<bool, MeetlrError> {
        let mut state = self.state.lock().await;
        state
            .deleted
            .push((schedule_id.to_string(), event_id.to_string()));
        Ok(state.delete_result)
    }
}

// --- Payments ---

struct PaymentState {
    refunds: Vec<(String, Option<i64>)>,
    refund_result: bool,
    statuses: HashMap<String, RemotePaymentStatus>,
}

pub struct MockPaymentProvider {
    state: Arc<Mutex<PaymentState>>,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(PaymentState {
                refunds: Vec::new(),
                refund_result: true,
                statuses: HashMap::new(),
            })),
        }
    }

    pub async fn decline_refunds(&self) {
        self.state.lock().await.refund_result = false;
    }

    /// Status reported for `intent`; unknown intents report `Pending`.
    pub async fn set_status(&self, intent: &str, status: RemotePaymentStatus) {
        self.state
            .lock()
            .await
            .statuses
            .insert(intent.to_string(), status);
    }

    pub async fn refunds(&self) -> Vec<(String, Option<i64>)> {
        self.state.lock().await.refunds.clone()
    }
}

impl Default for MockPaymentProvider {
    fn default() -> Self {
        Self::new()
    }
}

mock_adapter!(MockPaymentProvider, "mock-payment", AdapterType::Payment);

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn refund_payment(
        &self,
        payment_intent_id: &str,
        amount_cents: Option<i64>,
    ) -> Result<bool, MeetlrError> {
        let mut state = self.state.lock().await;
        state
            .refunds
            .push((payment_intent_id.to_string(), amount_cents));
        Ok(state.refund_result)
    }

    async fn payment_status(
        &self,
        payment_intent_id: &str,
    ) -> Result<RemotePaymentStatus, MeetlrError> {
        Ok(self
            .state
            .lock()
            .await
            .statuses
            .get(payment_intent_id)
            .copied()
            .unwrap_or(RemotePaymentStatus::Pending))
    }
}

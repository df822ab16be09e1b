// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the complete delivery pipeline.
//!
//! Each test wires an on-disk SQLite database, a manual clock, mock
//! collaborators, and the standard poller schedule. Tests are independent
//! and order-insensitive.

use std::sync::Arc;

use chrono::Duration;
use meetlr_booking::{BookingService, EventDispatcher, NewBooking, Policies};
use meetlr_config::model::{CreditsConfig, PollerConfig, ProvidersConfig};
use meetlr_core::types::RemotePaymentStatus;
use meetlr_core::{
    BookingError, BookingStatus, FinalStatus, MeetlrError, PaymentStatus, ServiceType,
};
use meetlr_credits::CreditLedger;
use meetlr_cron::{Poller, PollerDeps};
use meetlr_storage::Database;
use meetlr_storage::queries::{pending_tasks, task_history};
use meetlr_tasks::executors::{
    CalendarEventCreateExecutor, CalendarEventDeleteExecutor, NotificationExecutor,
    RefundPaymentExecutor, VideoMeetingCreateExecutor, VideoMeetingDeleteExecutor,
};
use meetlr_tasks::{ExecutorRegistry, RetryPolicy, TaskDispatcher};
use meetlr_test_utils::{
    ManualClock, MockCalendarProvider, MockMeetingProvider, MockPaymentProvider, MockSender,
    TestDatabase, fixtures,
};

struct Stack {
    _test_db: TestDatabase,
    db: Arc<Database>,
    clock: Arc<ManualClock>,
    ledger: Arc<CreditLedger>,
    email: Arc<MockSender>,
    sms: Arc<MockSender>,
    calendars: Arc<MockCalendarProvider>,
    payments: Arc<MockPaymentProvider>,
    service: Arc<BookingService>,
    dispatcher: Arc<TaskDispatcher>,
}

impl Stack {
    async fn new() -> Self {
        let test_db = TestDatabase::on_disk().await.unwrap();
        let db = test_db.db();
        let clock = Arc::new(ManualClock::new(fixtures::base_time()));

        let ledger = Arc::new(CreditLedger::from_database(&db, clock.clone()));
        ledger.grant_credits("host", ServiceType::Email, 10).await.unwrap();
        ledger.grant_credits("host", ServiceType::Sms, 5).await.unwrap();

        let email = Arc::new(MockSender::email());
        let sms = Arc::new(MockSender::new(ServiceType::Sms));
        let meetings = Arc::new(MockMeetingProvider::new());
        let calendars = Arc::new(MockCalendarProvider::new());
        let payments = Arc::new(MockPaymentProvider::new());

        let mut registry = ExecutorRegistry::new();
        registry.register(Arc::new(
            NotificationExecutor::new(ledger.clone(), CreditsConfig::default())
                .with_sender(email.clone())
                .with_sender(sms.clone()),
        ));
        registry.register(Arc::new(VideoMeetingCreateExecutor::new(
            meetings.clone(),
            ProvidersConfig::default().meeting_plugins,
        )));
        registry.register(Arc::new(VideoMeetingDeleteExecutor::new(meetings)));
        registry.register(Arc::new(CalendarEventCreateExecutor::new(calendars.clone())));
        registry.register(Arc::new(CalendarEventDeleteExecutor::new(calendars.clone())));
        registry.register(Arc::new(RefundPaymentExecutor::new(payments.clone())));

        let service = Arc::new(BookingService::new(
            db.clone(),
            Arc::new(EventDispatcher::with_default_handlers()),
            clock.clone(),
            Policies::default(),
        ));
        let dispatcher = Arc::new(TaskDispatcher::new(
            db.clone(),
            Arc::new(registry),
            RetryPolicy::default(),
            clock.clone(),
        ));

        Self {
            _test_db: test_db,
            db,
            clock,
            ledger,
            email,
            sms,
            calendars,
            payments,
            service,
            dispatcher,
        }
    }

    fn poller(&self, config: &PollerConfig) -> Poller {
        Poller::standard(
            config,
            PollerDeps {
                db: self.db.clone(),
                clock: self.clock.clone(),
                bookings: self.service.clone(),
                dispatcher: self.dispatcher.clone(),
                payments: self.payments.clone(),
            },
        )
    }
}

fn paid_booking(intent: &str) -> NewBooking {
    let start = fixtures::base_time() + Duration::days(10);
    NewBooking {
        tenant_id: "tenant".into(),
        meetlr_event_id: "ev".into(),
        host_user_id: "host".into(),
        title: "Consult".into(),
        attendee_name: "Ada".into(),
        attendee_email: "ada@example.com".into(),
        attendee_phone: Some("+15550100".into()),
        start_time: start,
        end_time: start + Duration::hours(1),
        price_cents: Some(5000),
        currency: "usd".into(),
        payment_intent_id: Some(intent.into()),
        location_type: None,
        auto_calendar_sync: true,
        sms_reminders: true,
        whatsapp_reminders: false,
    }
}

// ---- Paid booking through its whole lifecycle ----

#[tokio::test]
async fn paid_booking_lifecycle_delivers_every_side_effect() {
    let stack = Stack::new().await;
    let created = stack.service.create(paid_booking("pi_1")).await.unwrap();
    let id = created.booking.id.clone();
    assert_eq!(created.booking.status, BookingStatus::Pending);
    assert!(created.enqueued.is_empty());

    // Payment settles; reconciliation confirms on the fourth poll.
    stack
        .payments
        .set_status("pi_1", RemotePaymentStatus::Succeeded)
        .await;
    let config = PollerConfig::default();
    let mut poller = stack.poller(&config);
    for _ in 0..config.payment_reconciliation_every_polls {
        assert!(poller.tick().await.failed.is_empty());
    }
    stack.clock.advance(Duration::seconds(30));
    poller.tick().await;

    let booking = stack.service.get(&id).await.unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.payment_status, PaymentStatus::Completed);
    assert_eq!(booking.calendar_event_id.as_deref(), Some("evt-1"));
    assert_eq!(stack.email.sent().await.len(), 1);
    // The SMS reminder waits for its offset.
    assert!(stack.sms.sent().await.is_empty());

    // Reschedule replaces the calendar event.
    let new_start = booking.start_time + Duration::days(2);
    stack
        .service
        .reschedule(&id, new_start, new_start + Duration::hours(1))
        .await
        .unwrap();
    let report = stack.dispatcher.drain_due(50).await.unwrap();
    assert_eq!(report.claimed, 3);
    assert_eq!(report.failed, 0);
    assert!(
        stack
            .calendars
            .deleted()
            .await
            .contains(&("sched-1".to_string(), "evt-1".to_string()))
    );
    let booking = stack.service.get(&id).await.unwrap().unwrap();
    assert_eq!(booking.calendar_event_id.as_deref(), Some("evt-2"));

    // Cancellation refunds the payment and removes the event.
    stack
        .service
        .cancel(&id, Some("host unavailable".into()))
        .await
        .unwrap();
    let report = stack.dispatcher.drain_due(50).await.unwrap();
    assert_eq!(report.failed, 0);
    assert_eq!(
        stack.payments.refunds().await,
        vec![("pi_1".to_string(), Some(5000))]
    );
    let booking = stack.service.get(&id).await.unwrap().unwrap();
    assert_eq!(booking.payment_status, PaymentStatus::Refunded);
    assert!(
        stack
            .calendars
            .deleted()
            .await
            .contains(&("sched-2".to_string(), "evt-2".to_string()))
    );

    // A second cancel is rejected outright.
    let err = stack.service.cancel(&id, None).await.unwrap_err();
    assert!(matches!(
        err,
        MeetlrError::Booking(BookingError::AlreadyCancelled(_))
    ));

    // Every leftover reminder is skipped once due.
    stack.clock.advance(Duration::days(20));
    let report = stack.dispatcher.drain_due(50).await.unwrap();
    assert!(report.claimed > 0);
    assert_eq!(report.skipped, report.claimed);
    assert!(
        pending_tasks::list_for_booking(&stack.db, &id)
            .await
            .unwrap()
            .is_empty()
    );
    let history = task_history::list_for_booking(&stack.db, &id).await.unwrap();
    assert!(history.iter().all(|h| h.final_status == FinalStatus::Sent));

    let subjects: Vec<_> = stack
        .email
        .sent()
        .await
        .into_iter()
        .map(|n| n.subject)
        .collect();
    assert_eq!(
        subjects,
        vec![
            "Confirmed: Consult".to_string(),
            "Rescheduled: Consult".to_string(),
            "Cancelled: Consult".to_string(),
        ]
    );
    assert!(stack.sms.sent().await.is_empty());
    assert_eq!(
        stack.ledger.balance("host", ServiceType::Email).await.unwrap(),
        7
    );
}

// ---- Unpaid booking expires ----

#[tokio::test]
async fn unpaid_booking_expires_without_refund() {
    let stack = Stack::new().await;
    let created = stack.service.create(paid_booking("pi_2")).await.unwrap();
    let id = created.booking.id.clone();

    stack.clock.advance(Duration::hours(2));
    let config = PollerConfig {
        expired_booking_every_polls: 1,
        ..PollerConfig::default()
    };
    let mut poller = stack.poller(&config);
    assert!(poller.tick().await.failed.is_empty());

    let booking = stack.service.get(&id).await.unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Cancelled);
    assert_eq!(
        booking.cancellation_reason.as_deref(),
        Some("payment not completed in time")
    );

    poller.tick().await;
    let sent = stack.email.sent().await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].subject.starts_with("Cancelled"));
    assert!(stack.payments.refunds().await.is_empty());
}

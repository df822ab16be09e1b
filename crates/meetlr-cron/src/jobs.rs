// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Maintenance jobs run by the poller.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use meetlr_booking::BookingService;
use meetlr_core::types::RemotePaymentStatus;
use meetlr_core::{Clock, MeetlrError, PaymentProvider, PaymentStatus};
use meetlr_storage::Database;
use meetlr_storage::queries::{bookings, maintenance, pending_tasks};
use meetlr_tasks::TaskDispatcher;
use tracing::{debug, info, warn};

pub const EXPIRED_BOOKING_REASON: &str = "payment not completed in time";

/// A unit of periodic work.
#[async_trait]
pub trait MaintenanceJob: Send + Sync {
    /// Stable name used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Run once; returns the number of rows acted on.
    async fn run(&self) -> Result<usize, MeetlrError>;
}

/// Drains due pending tasks.
pub struct DispatchPendingTasks {
    dispatcher: Arc<TaskDispatcher>,
    batch_size: usize,
    #[cfg_attr(not(feature = "prometheus"), allow(dead_code))]
    db: Arc<Database>,
}

impl DispatchPendingTasks {
    pub fn new(dispatcher: Arc<TaskDispatcher>, db: Arc<Database>, batch_size: usize) -> Self {
        Self {
            dispatcher,
            batch_size,
            db,
        }
    }
}

#[async_trait]
impl MaintenanceJob for DispatchPendingTasks {
    fn name(&self) -> &'static str {
        "dispatch_pending_tasks"
    }

    async fn run(&self) -> Result<usize, MeetlrError> {
        let report = self.dispatcher.drain_due(self.batch_size).await?;

        #[cfg(feature = "prometheus")]
        for (status, count) in pending_tasks::count_by_status(&self.db).await? {
            meetlr_prometheus::set_pending_tasks(&status.to_string(), count);
        }

        Ok(report.claimed)
    }
}

/// Cancels pending bookings whose payment never completed.
pub struct ExpiredPendingBookingCleanup {
    bookings: Arc<BookingService>,
    clock: Arc<dyn Clock>,
}

impl ExpiredPendingBookingCleanup {
    pub fn new(bookings: Arc<BookingService>, clock: Arc<dyn Clock>) -> Self {
        Self { bookings, clock }
    }
}

#[async_trait]
impl MaintenanceJob for ExpiredPendingBookingCleanup {
    fn name(&self) -> &'static str {
        "expired_booking_cleanup"
    }

    async fn run(&self) -> Result<usize, MeetlrError> {
        let timeout = self.bookings.policies().booking.pending_payment_timeout;
        let cutoff = self.clock.now() - timeout;
        let expired = bookings::list_expired_pending(self.bookings.database(), cutoff).await?;

        let mut cancelled = 0;
        for id in expired {
            // Goes through the service so the cancellation fans out like any other.
            match self
                .bookings
                .cancel(&id, Some(EXPIRED_BOOKING_REASON.to_string()))
                .await
            {
                Ok(_) => {
                    cancelled += 1;
                    info!(booking_id = %id, "expired unpaid booking cancelled");
                }
                Err(MeetlrError::Booking(e)) => {
                    debug!(booking_id = %id, error = %e, "expired booking no longer cancellable");
                }
                Err(e) => warn!(booking_id = %id, error = %e, "failed to cancel expired booking"),
            }
        }
        Ok(cancelled)
    }
}

pub struct OneTimeCodeCleanup {
    db: Arc<Database>,
    clock: Arc<dyn Clock>,
}

impl OneTimeCodeCleanup {
    pub fn new(db: Arc<Database>, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }
}

#[async_trait]
impl MaintenanceJob for OneTimeCodeCleanup {
    fn name(&self) -> &'static str {
        "one_time_code_cleanup"
    }

    async fn run(&self) -> Result<usize, MeetlrError> {
        maintenance::delete_stale_one_time_codes(&self.db, self.clock.now()).await
    }
}

/// Settles bookings whose payment intent changed state at the processor.
pub struct PaymentReconciliation {
    bookings: Arc<BookingService>,
    provider: Arc<dyn PaymentProvider>,
    clock: Arc<dyn Clock>,
    batch_size: usize,
}

impl PaymentReconciliation {
    pub fn new(
        bookings: Arc<BookingService>,
        provider: Arc<dyn PaymentProvider>,
        clock: Arc<dyn Clock>,
        batch_size: usize,
    ) -> Self {
        Self {
            bookings,
            provider,
            clock,
            batch_size,
        }
    }
}

#[async_trait]
impl MaintenanceJob for PaymentReconciliation {
    fn name(&self) -> &'static str {
        "payment_reconciliation"
    }

    async fn run(&self) -> Result<usize, MeetlrError> {
        let db = self.bookings.database();
        let awaiting = bookings::list_awaiting_payment(db, self.batch_size).await?;

        let mut settled = 0;
        for booking in awaiting {
            let Some(intent) = booking.payment_intent_id.as_deref() else {
                continue;
            };
            let status = match self.provider.payment_status(intent).await {
                Ok(status) => status,
                Err(e) => {
                    warn!(booking_id = %booking.id, error = %e, "payment status lookup failed");
                    continue;
                }
            };
            let result = match status {
                RemotePaymentStatus::Pending => continue,
                RemotePaymentStatus::Succeeded => self
                    .bookings
                    .mark_payment_completed(&booking.id)
                    .await
                    .map(|_| ()),
                RemotePaymentStatus::Failed => {
                    bookings::set_payment_status(db, &booking.id, PaymentStatus::Failed, self.clock.now())
                        .await
                        .map(|_| ())
                }
            };
            match result {
                Ok(()) => {
                    settled += 1;
                    info!(booking_id = %booking.id, ?status, "payment reconciled");
                }
                Err(e) => warn!(booking_id = %booking.id, error = %e, "payment reconciliation failed"),
            }
        }
        Ok(settled)
    }
}

pub struct SlotInvitationExpiry {
    db: Arc<Database>,
    clock: Arc<dyn Clock>,
}

impl SlotInvitationExpiry {
    pub fn new(db: Arc<Database>, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }
}

#[async_trait]
impl MaintenanceJob for SlotInvitationExpiry {
    fn name(&self) -> &'static str {
        "slot_invitation_expiry"
    }

    async fn run(&self) -> Result<usize, MeetlrError> {
        maintenance::expire_slot_invitations(&self.db, self.clock.now()).await
    }
}

/// Requeues rows left in `processing` past the lease TTL, e.g. after a crash
/// between claim and finalize.
pub struct LeaseReclaim {
    db: Arc<Database>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl LeaseReclaim {
    pub fn new(db: Arc<Database>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { db, clock, ttl }
    }
}

#[async_trait]
impl MaintenanceJob for LeaseReclaim {
    fn name(&self) -> &'static str {
        "lease_reclaim"
    }

    async fn run(&self) -> Result<usize, MeetlrError> {
        let requeued = pending_tasks::requeue_stale(&self.db, self.clock.now() - self.ttl).await?;
        if requeued > 0 {
            warn!(requeued, ttl_secs = self.ttl.num_seconds(), "requeued tasks with expired leases");
        }
        Ok(requeued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meetlr_booking::{EventDispatcher, Policies};
    use meetlr_core::{BookingStatus, TaskKind, TaskStatus};
    use meetlr_storage::{OneTimeCode, SlotInvitationStatus};
    use meetlr_test_utils::{ManualClock, MockPaymentProvider, fixtures};

    struct Env {
        db: Arc<Database>,
        clock: Arc<ManualClock>,
        bookings: Arc<BookingService>,
    }

    async fn env() -> Env {
        let db = Arc::new(Database::open_in_memory().await.unwrap());
        let clock = Arc::new(ManualClock::new(fixtures::base_time()));
        let bookings = Arc::new(BookingService::new(
            db.clone(),
            Arc::new(EventDispatcher::with_default_handlers()),
            clock.clone(),
            Policies::default(),
        ));
        Env { db, clock, bookings }
    }

    #[tokio::test]
    async fn expired_unpaid_booking_is_cancelled_with_event() {
        let e = env().await;
        bookings::insert(&e.db, &fixtures::awaiting_payment_booking("b1", "pi_1"))
            .await
            .unwrap();
        let job = ExpiredPendingBookingCleanup::new(e.bookings.clone(), e.clock.clone());

        e.clock.advance(Duration::minutes(59));
        assert_eq!(job.run().await.unwrap(), 0);

        e.clock.advance(Duration::minutes(2));
        assert_eq!(job.run().await.unwrap(), 1);
        let b = bookings::get(&e.db, "b1").await.unwrap().unwrap();
        assert_eq!(b.status, BookingStatus::Cancelled);
        assert_eq!(b.cancellation_reason.as_deref(), Some(EXPIRED_BOOKING_REASON));
        let tasks = pending_tasks::list_for_booking(&e.db, "b1").await.unwrap();
        assert!(tasks.iter().any(|t| t.kind == TaskKind::CancellationEmail));
        assert!(tasks.iter().all(|t| t.kind != TaskKind::RefundPayment));

        // Already cancelled: nothing more to do.
        assert_eq!(job.run().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn reconciliation_confirms_paid_and_marks_failed() {
        let e = env().await;
        bookings::insert(&e.db, &fixtures::awaiting_payment_booking("paid", "pi_ok"))
            .await
            .unwrap();
        bookings::insert(&e.db, &fixtures::awaiting_payment_booking("declined", "pi_bad"))
            .await
            .unwrap();
        bookings::insert(&e.db, &fixtures::awaiting_payment_booking("open", "pi_wait"))
            .await
            .unwrap();
        let provider = Arc::new(MockPaymentProvider::new());
        provider.set_status("pi_ok", RemotePaymentStatus::Succeeded).await;
        provider.set_status("pi_bad", RemotePaymentStatus::Failed).await;

        let job = PaymentReconciliation::new(e.bookings.clone(), provider, e.clock.clone(), 50);
        assert_eq!(job.run().await.unwrap(), 2);

        let paid = bookings::get(&e.db, "paid").await.unwrap().unwrap();
        assert_eq!(paid.status, BookingStatus::Confirmed);
        assert_eq!(paid.payment_status, PaymentStatus::Completed);
        let declined = bookings::get(&e.db, "declined").await.unwrap().unwrap();
        assert_eq!(declined.payment_status, PaymentStatus::Failed);
        let open = bookings::get(&e.db, "open").await.unwrap().unwrap();
        assert_eq!(open.payment_status, PaymentStatus::Pending);

        let tasks = pending_tasks::list_for_booking(&e.db, "paid").await.unwrap();
        assert!(tasks.iter().any(|t| t.kind == TaskKind::ConfirmationEmail));
    }

    #[tokio::test]
    async fn lease_reclaim_requeues_only_stale_rows() {
        let e = env().await;
        let booking = fixtures::confirmed_booking("b1");
        let now = e.clock.now();
        pending_tasks::insert(&e.db, &fixtures::notification_task(&booking, TaskKind::ConfirmationEmail, now))
            .await
            .unwrap();
        let claimed = pending_tasks::claim_due(&e.db, now, 10).await.unwrap();
        assert_eq!(claimed.len(), 1);

        let job = LeaseReclaim::new(e.db.clone(), e.clock.clone(), Duration::seconds(600));
        e.clock.advance(Duration::seconds(300));
        assert_eq!(job.run().await.unwrap(), 0);

        e.clock.advance(Duration::seconds(301));
        assert_eq!(job.run().await.unwrap(), 1);
        let row = pending_tasks::get(&e.db, &claimed[0].id).await.unwrap().unwrap();
        assert_eq!(row.status, TaskStatus::Queued);
        assert!(row.processing_started_at.is_none());
    }

    #[tokio::test]
    async fn code_and_invitation_cleanup() {
        let e = env().await;
        let now = e.clock.now();
        maintenance::insert_one_time_code(
            &e.db,
            &OneTimeCode {
                id: "otc1".into(),
                user_id: "host".into(),
                purpose: "login".into(),
                code_hash: "h".into(),
                expires_at: now + Duration::minutes(15),
                consumed_at: None,
                created_at: now,
            },
        )
        .await
        .unwrap();
        let slots = meetlr_booking::SlotInvitationService::new(
            e.db.clone(),
            e.clock.clone(),
            Policies::default(),
        );
        let (invitation, _) = slots
            .invite(meetlr_booking::SlotOffer {
                tenant_id: "tenant".into(),
                meetlr_event_id: "ev".into(),
                host_user_id: "host".into(),
                title: "Consult".into(),
                invitee_email: "grace@example.com".into(),
                slot_start: now + Duration::days(2),
                slot_end: now + Duration::days(2) + Duration::hours(1),
            })
            .await
            .unwrap();

        let codes = OneTimeCodeCleanup::new(e.db.clone(), e.clock.clone());
        let invites = SlotInvitationExpiry::new(e.db.clone(), e.clock.clone());
        assert_eq!(codes.run().await.unwrap(), 0);
        assert_eq!(invites.run().await.unwrap(), 0);

        e.clock.advance(Duration::minutes(31));
        assert_eq!(codes.run().await.unwrap(), 1);
        assert_eq!(invites.run().await.unwrap(), 1);
        let stored = maintenance::get_slot_invitation(&e.db, &invitation.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, SlotInvitationStatus::Expired);
    }
}

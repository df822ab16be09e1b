// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Booking service: one unit of work per lifecycle transition.
//!
//! Load, transition, save, dispatch, and enqueue all run inside a single
//! SQLite transaction on the writer thread. Each handler's rows are inserted
//! under their own savepoint, so a failing handler loses only its own rows
//! while the transition and every other handler's rows still commit.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use meetlr_core::{
    Booking, BookingStatus, Clock, LifecycleEvent, MeetlrError, PaymentStatus, PendingTask,
};
use meetlr_storage::Database;
use meetlr_storage::database::flatten_tr_err;
use meetlr_storage::queries::{bookings, pending_tasks};
use tracing::{debug, info, warn};

use crate::aggregate::{BookingLifecycle, NewBooking};
use crate::dispatcher::{EnqueueContext, EventDispatcher, HandlerOutput};
use crate::policy::{BookingPolicy, Policies};

/// A handler whose rows were not enqueued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerFailure {
    pub handler: &'static str,
    pub error: String,
}

/// What a committed transition produced.
#[derive(Debug, Clone)]
pub struct TransitionReport {
    pub booking: Booking,
    pub event: LifecycleEvent,
    pub enqueued: Vec<PendingTask>,
    pub handler_failures: Vec<HandlerFailure>,
}

pub struct BookingService {
    db: Arc<Database>,
    dispatcher: Arc<EventDispatcher>,
    clock: Arc<dyn Clock>,
    policies: Policies,
}

impl BookingService {
    pub fn new(
        db: Arc<Database>,
        dispatcher: Arc<EventDispatcher>,
        clock: Arc<dyn Clock>,
        policies: Policies,
    ) -> Self {
        Self {
            db,
            dispatcher,
            clock,
            policies,
        }
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn policies(&self) -> &Policies {
        &self.policies
    }

    pub async fn get(&self, id: &str) -> Result<Option<Booking>, MeetlrError> {
        bookings::get(&self.db, id).await
    }

    /// Persist a new booking and raise `Created`.
    pub async fn create(&self, new: NewBooking) -> Result<TransitionReport, MeetlrError> {
        let now = self.clock.now();
        let (booking, event) = new.into_booking(now)?;
        self.unit_of_work(now, move |conn, _| {
            bookings::insert_tx(conn, &booking).map_err(MeetlrError::storage)?;
            Ok((booking, event))
        })
        .await
    }

    pub async fn confirm(&self, id: &str) -> Result<TransitionReport, MeetlrError> {
        self.transition(id, |booking, now, _| booking.confirm(now))
            .await
    }

    pub async fn cancel(
        &self,
        id: &str,
        reason: Option<String>,
    ) -> Result<TransitionReport, MeetlrError> {
        self.transition(id, move |booking, now, _| booking.cancel(reason, now))
            .await
    }

    pub async fn reschedule(
        &self,
        id: &str,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
    ) -> Result<TransitionReport, MeetlrError> {
        self.transition(id, move |booking, now, policy| {
            booking.reschedule(new_start, new_end, now, policy)
        })
        .await
    }

    /// Record a settled payment and confirm the booking in the same unit of
    /// work.
    pub async fn mark_payment_completed(&self, id: &str) -> Result<TransitionReport, MeetlrError> {
        self.transition(id, |booking, now, _| {
            if booking.status == BookingStatus::Pending {
                booking.payment_status = PaymentStatus::Completed;
            }
            booking.confirm(now)
        })
        .await
    }

    async fn transition<F>(&self, id: &str, f: F) -> Result<TransitionReport, MeetlrError>
    where
        F: FnOnce(
                &mut Booking,
                DateTime<Utc>,
                &BookingPolicy,
            ) -> Result<LifecycleEvent, meetlr_core::BookingError>
            + Send
            + 'static,
    {
        let id = id.to_string();
        let policy = self.policies.booking.clone();
        self.unit_of_work(self.clock.now(), move |conn, now| {
            let mut booking = bookings::get_tx(conn, &id)
                .map_err(MeetlrError::storage)?
                .ok_or_else(|| MeetlrError::NotFound {
                    entity: "booking",
                    id: id.clone(),
                })?;
            let event = f(&mut booking, now, &policy)?;
            bookings::save_tx(conn, &booking).map_err(MeetlrError::storage)?;
            Ok((booking, event))
        })
        .await
    }

    async fn unit_of_work<F>(
        &self,
        now: DateTime<Utc>,
        apply: F,
    ) -> Result<TransitionReport, MeetlrError>
    where
        F: FnOnce(&rusqlite::Connection, DateTime<Utc>) -> Result<(Booking, LifecycleEvent), MeetlrError>
            + Send
            + 'static,
    {
        let dispatcher = Arc::clone(&self.dispatcher);
        let ctx = EnqueueContext {
            now,
            policy: self.policies.tasks.clone(),
        };

        let report = self
            .db
            .connection()
            .call(move |conn| {
                let mut tx = conn.transaction().map_err(MeetlrError::storage)?;
                let (booking, event) = apply(&*tx, now)?;
                let outputs = dispatcher.dispatch(&event, &booking, &ctx);
                let (enqueued, handler_failures) = enqueue_outputs(&mut tx, outputs)?;
                tx.commit().map_err(MeetlrError::storage)?;
                Ok(TransitionReport {
                    booking,
                    event,
                    enqueued,
                    handler_failures,
                })
            })
            .await
            .map_err(flatten_tr_err)?;

        for failure in &report.handler_failures {
            warn!(
                booking_id = %report.booking.id,
                event = %report.event.kind(),
                handler = failure.handler,
                error = %failure.error,
                "enqueuing handler failed; transition committed without its tasks"
            );
        }
        for task in &report.enqueued {
            debug!(
                task_id = %task.id,
                kind = %task.kind,
                execute_at = %task.execute_at,
                "task enqueued"
            );
            #[cfg(feature = "prometheus")]
            meetlr_prometheus::record_enqueued(&task.kind.to_string());
        }
        info!(
            booking_id = %report.booking.id,
            event = %report.event.kind(),
            enqueued = report.enqueued.len(),
            "booking transition committed"
        );
        Ok(report)
    }
}

fn enqueue_outputs(
    tx: &mut rusqlite::Transaction<'_>,
    outputs: Vec<HandlerOutput>,
) -> Result<(Vec<PendingTask>, Vec<HandlerFailure>), MeetlrError> {
    let mut enqueued = Vec::new();
    let mut failures = Vec::new();

    for output in outputs {
        let tasks = match output.result {
            Ok(tasks) if tasks.is_empty() => continue,
            Ok(tasks) => tasks,
            Err(e) => {
                failures.push(HandlerFailure {
                    handler: output.handler,
                    error: e.to_string(),
                });
                continue;
            }
        };

        // Dropping the savepoint without commit rolls back this handler only.
        let sp = tx.savepoint().map_err(MeetlrError::storage)?;
        match tasks.iter().try_for_each(|t| pending_tasks::insert_tx(&sp, t)) {
            Ok(()) => {
                sp.commit().map_err(MeetlrError::storage)?;
                enqueued.extend(tasks);
            }
            Err(e) => failures.push(HandlerFailure {
                handler: output.handler,
                error: e.to_string(),
            }),
        }
    }
    Ok((enqueued, failures))
}

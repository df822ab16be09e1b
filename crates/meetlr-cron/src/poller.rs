// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The scheduled poller.
//!
//! One loop on a fixed interval. Each tick advances every job's cadence and
//! runs the due jobs in registration order. A failing job is logged and the
//! rest of the tick still runs.

use std::sync::Arc;
use std::time::Duration;

use meetlr_booking::BookingService;
use meetlr_config::model::PollerConfig;
use meetlr_core::{Clock, PaymentProvider};
use meetlr_storage::Database;
use meetlr_tasks::TaskDispatcher;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::cadence::Cadence;
use crate::jobs::{
    DispatchPendingTasks, ExpiredPendingBookingCleanup, LeaseReclaim, MaintenanceJob,
    OneTimeCodeCleanup, PaymentReconciliation, SlotInvitationExpiry,
};

struct ScheduledJob {
    cadence: Cadence,
    job: Arc<dyn MaintenanceJob>,
}

/// Jobs that ran on one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub succeeded: Vec<&'static str>,
    pub failed: Vec<&'static str>,
}

/// Collaborators the standard job set needs.
pub struct PollerDeps {
    pub db: Arc<Database>,
    pub clock: Arc<dyn Clock>,
    pub bookings: Arc<BookingService>,
    pub dispatcher: Arc<TaskDispatcher>,
    pub payments: Arc<dyn PaymentProvider>,
}

pub struct Poller {
    interval: Duration,
    jobs: Vec<ScheduledJob>,
}

impl Poller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            jobs: Vec::new(),
        }
    }

    /// The full maintenance schedule with cadences from `config`.
    pub fn standard(config: &PollerConfig, deps: PollerDeps) -> Self {
        let PollerDeps {
            db,
            clock,
            bookings,
            dispatcher,
            payments,
        } = deps;
        let lease_ttl =
            chrono::Duration::seconds(i64::try_from(config.lease_ttl_secs).unwrap_or(i64::MAX));

        Self::new(Duration::from_secs(config.poll_interval_secs))
            .with_job(
                config.dispatch_every_polls,
                Arc::new(DispatchPendingTasks::new(
                    dispatcher,
                    db.clone(),
                    config.dispatch_batch_size,
                )),
            )
            .with_job(
                config.expired_booking_every_polls,
                Arc::new(ExpiredPendingBookingCleanup::new(bookings.clone(), clock.clone())),
            )
            .with_job(
                config.one_time_code_every_polls,
                Arc::new(OneTimeCodeCleanup::new(db.clone(), clock.clone())),
            )
            .with_job(
                config.payment_reconciliation_every_polls,
                Arc::new(PaymentReconciliation::new(
                    bookings,
                    payments,
                    clock.clone(),
                    config.dispatch_batch_size,
                )),
            )
            .with_job(
                config.slot_expiry_every_polls,
                Arc::new(SlotInvitationExpiry::new(db.clone(), clock.clone())),
            )
            .with_job(
                config.lease_reclaim_every_polls,
                Arc::new(LeaseReclaim::new(db, clock, lease_ttl)),
            )
    }

    pub fn with_job(mut self, every_polls: u32, job: Arc<dyn MaintenanceJob>) -> Self {
        self.jobs.push(ScheduledJob {
            cadence: Cadence::every(every_polls),
            job,
        });
        self
    }

    /// Job names with their cadence, in run order.
    pub fn schedule(&self) -> Vec<(&'static str, u32)> {
        self.jobs
            .iter()
            .map(|s| (s.job.name(), s.cadence.every_polls()))
            .collect()
    }

    /// Advance every cadence by one poll and run the due jobs.
    pub async fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();
        for scheduled in &mut self.jobs {
            if !scheduled.cadence.advance() {
                continue;
            }
            let job = scheduled.job.name();
            match scheduled.job.run().await {
                Ok(affected) => {
                    debug!(job, affected, "job finished");
                    report.succeeded.push(job);
                    #[cfg(feature = "prometheus")]
                    meetlr_prometheus::record_job_run(job, "ok");
                }
                Err(e) => {
                    error!(job, error = %e, "job failed");
                    report.failed.push(job);
                    #[cfg(feature = "prometheus")]
                    meetlr_prometheus::record_job_run(job, "error");
                }
            }
        }
        report
    }

    /// Tick on the configured interval until `cancel` fires.
    ///
    /// A tick in progress finishes before the loop exits.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            interval_secs = self.interval.as_secs(),
            jobs = self.jobs.len(),
            "poller started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }
        info!("poller stopped");
    }
}

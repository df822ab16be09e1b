// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Claim, execute, and finalize due pending tasks.
//!
//! Rows of one drain run sequentially. Each row is finalized in its own
//! transaction: a success archives the row and applies its booking update
//! together, a retryable failure returns the row to `failed` with a backoff,
//! and anything else archives it as failed.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use meetlr_core::{Booking, Clock, FailureCategory, FinalStatus, MeetlrError, PendingTask};
use meetlr_storage::Database;
use meetlr_storage::queries::pending_tasks::{self, Archive};
use meetlr_storage::queries::{bookings, pending_tasks::archive_tx};
use meetlr_storage::map_tr_err;
use tracing::{debug, error, info, warn};

use crate::executor::{ExecutionError, ExecutionOutcome, TaskExecutor};
use crate::registry::ExecutorRegistry;
use crate::retry::RetryPolicy;

/// Tally of one [`TaskDispatcher::drain_due`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub claimed: usize,
    /// Archived as sent, skips included.
    pub sent: usize,
    pub skipped: usize,
    pub retried: usize,
    pub failed: usize,
    /// Rows that left `processing` before their finalization applied.
    pub stale: usize,
    /// Rows whose finalization itself failed; they stay `processing` until
    /// the lease watchdog requeues them.
    pub errors: usize,
}

enum Finalized {
    Sent { skipped: bool },
    Retried,
    Failed,
    Stale,
}

pub struct TaskDispatcher {
    db: Arc<Database>,
    registry: Arc<ExecutorRegistry>,
    retry: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl TaskDispatcher {
    pub fn new(
        db: Arc<Database>,
        registry: Arc<ExecutorRegistry>,
        retry: RetryPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            db,
            registry,
            retry,
            clock,
        }
    }

    /// Claim up to `limit` due rows and process each one.
    ///
    /// Only the claim itself can fail the call; per-row errors are logged
    /// and counted in [`DrainReport::errors`].
    pub async fn drain_due(&self, limit: usize) -> Result<DrainReport, MeetlrError> {
        let now = self.clock.now();
        let claimed = pending_tasks::claim_due(&self.db, now, limit).await?;
        let mut report = DrainReport {
            claimed: claimed.len(),
            ..DrainReport::default()
        };
        if claimed.is_empty() {
            return Ok(report);
        }
        debug!(count = claimed.len(), "claimed due tasks");

        for task in claimed {
            match self.process(&task).await {
                Ok(Finalized::Sent { skipped }) => {
                    report.sent += 1;
                    if skipped {
                        report.skipped += 1;
                    }
                }
                Ok(Finalized::Retried) => report.retried += 1,
                Ok(Finalized::Failed) => report.failed += 1,
                Ok(Finalized::Stale) => report.stale += 1,
                Err(e) => {
                    report.errors += 1;
                    error!(task_id = %task.id, kind = %task.kind, error = %e, "task finalization failed");
                }
            }
        }

        info!(
            claimed = report.claimed,
            sent = report.sent,
            retried = report.retried,
            failed = report.failed,
            stale = report.stale,
            errors = report.errors,
            "drain complete"
        );
        Ok(report)
    }

    async fn process(&self, task: &PendingTask) -> Result<Finalized, MeetlrError> {
        let started = Instant::now();
        let executor = self.registry.get(task.kind);

        let result = match self.load_booking(task).await? {
            Err(e) => Err(e),
            Ok(booking) => match &executor {
                Some(executor) => executor.execute(task, booking.as_ref()).await,
                None => Err(ExecutionError::permanent(format!(
                    "no executor registered for {}",
                    task.kind
                ))),
            },
        };
        let elapsed = started.elapsed();

        #[cfg(feature = "prometheus")]
        meetlr_prometheus::record_processing_time(&task.kind.to_string(), elapsed.as_secs_f64());

        let processing_time_ms = i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX);
        let now = self.clock.now();
        let finalized = match result {
            Ok(outcome) => self.finish_sent(task, outcome, now, processing_time_ms).await?,
            Err(err) => {
                self.finish_failed(task, executor.as_deref(), err, now, processing_time_ms)
                    .await?
            }
        };

        #[cfg(feature = "prometheus")]
        meetlr_prometheus::record_finalized(
            &task.kind.to_string(),
            match finalized {
                Finalized::Sent { skipped: false } => "sent",
                Finalized::Sent { skipped: true } => "skipped",
                Finalized::Retried => "retried",
                Finalized::Failed => "failed",
                Finalized::Stale => "stale",
            },
        );
        Ok(finalized)
    }

    /// The task's booking, or a permanent failure if it was deleted.
    async fn load_booking(
        &self,
        task: &PendingTask,
    ) -> Result<Result<Option<Booking>, ExecutionError>, MeetlrError> {
        let Some(booking_id) = task.booking_id.as_deref() else {
            return Ok(Ok(None));
        };
        match bookings::get(&self.db, booking_id).await? {
            Some(booking) => Ok(Ok(Some(booking))),
            None => {
                warn!(task_id = %task.id, booking_id, "booking no longer exists");
                Ok(Err(ExecutionError::permanent(format!(
                    "booking {booking_id} not found"
                ))))
            }
        }
    }

    async fn finish_sent(
        &self,
        task: &PendingTask,
        outcome: ExecutionOutcome,
        now: DateTime<Utc>,
        processing_time_ms: i64,
    ) -> Result<Finalized, MeetlrError> {
        let skipped = outcome.skipped.is_some();
        let mut done = task.clone();
        done.external_message_id = outcome.external_id.or(done.external_message_id);
        if let Some(reason) = &outcome.skipped {
            done.error_details = Some(format!("skipped: {reason}"));
        }
        let archive = Archive {
            final_status: FinalStatus::Sent,
            failure_category: None,
            processed_at: now,
            processing_time_ms,
        };
        let update = outcome.booking_update;

        let archived = self
            .db
            .connection()
            .call(move |conn| {
                let tx = conn.transaction()?;
                let archived = archive_tx(&tx, &done, &archive)?;
                if archived
                    && let (Some(update), Some(booking_id)) = (&update, &done.booking_id)
                {
                    bookings::apply_update_tx(&tx, booking_id, update, now)?;
                }
                tx.commit()?;
                Ok(archived)
            })
            .await
            .map_err(map_tr_err)?;

        if !archived {
            warn!(task_id = %task.id, "task left processing before it could be archived");
            return Ok(Finalized::Stale);
        }
        debug!(task_id = %task.id, kind = %task.kind, skipped, "task sent");
        Ok(Finalized::Sent { skipped })
    }

    async fn finish_failed(
        &self,
        task: &PendingTask,
        executor: Option<&dyn TaskExecutor>,
        err: ExecutionError,
        now: DateTime<Utc>,
        processing_time_ms: i64,
    ) -> Result<Finalized, MeetlrError> {
        let message = err.to_string();
        let category = err.category();
        let mut failed = task.clone();
        failed.error_message = Some(message.clone());

        if category == FailureCategory::Transient {
            let next = task.retry_count.saturating_add(1);
            if next < task.max_retries {
                let next_retry_at = now + self.retry.delay_for(task.retry_count);
                let scheduled = pending_tasks::schedule_retry(
                    &self.db,
                    &task.id,
                    next,
                    next_retry_at,
                    &message,
                    None,
                )
                .await?;
                if !scheduled {
                    warn!(task_id = %task.id, "task left processing before its retry was scheduled");
                    return Ok(Finalized::Stale);
                }
                warn!(
                    task_id = %task.id,
                    kind = %task.kind,
                    retry_count = next,
                    next_retry_at = %next_retry_at,
                    error = %message,
                    "task failed, retry scheduled"
                );
                return Ok(Finalized::Retried);
            }
            failed.retry_count = next;
        }

        let archive = Archive {
            final_status: FinalStatus::Failed,
            failure_category: Some(category),
            processed_at: now,
            processing_time_ms,
        };
        if !pending_tasks::archive(&self.db, &failed, archive).await? {
            warn!(task_id = %task.id, "task left processing before it could be archived");
            return Ok(Finalized::Stale);
        }

        match category {
            FailureCategory::InsufficientCredits => warn!(
                task_id = %task.id,
                kind = %task.kind,
                user_id = %task.user_id,
                billing_escalation = true,
                error = %message,
                "task failed for lack of credits"
            ),
            _ => warn!(
                task_id = %task.id,
                kind = %task.kind,
                retry_count = failed.retry_count,
                category = %category,
                error = %message,
                "task failed permanently"
            ),
        }

        if let Some(executor) = executor
            && let Err(e) = executor.on_terminal_failure(&failed).await
        {
            error!(task_id = %task.id, executor = executor.name(), error = %e, "terminal failure hook failed");
        }
        Ok(Finalized::Failed)
    }
}

// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pending-task queue operations.
//!
//! Every status change is a conditional UPDATE on the current status, so a
//! row can only move along the task state machine.

use chrono::{DateTime, Utc};
use meetlr_core::time::format_ts;
use meetlr_core::{FailureCategory, FinalStatus, MeetlrError, PendingTask, TaskStatus};
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, map_tr_err};
use crate::queries::row::{enum_col, json_col, opt_ts, to_json, ts};

pub(crate) const COLUMNS: &str = "id, tenant_id, booking_id, meetlr_event_id, user_id, kind,
    trigger_kind, payload_json, recipient, status, scheduled_at, execute_at,
    processing_started_at, next_retry_at, retry_count, max_retries, error_message,
    error_details, external_message_id";

fn from_row(row: &Row<'_>) -> rusqlite::Result<PendingTask> {
    Ok(PendingTask {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        booking_id: row.get(2)?,
        meetlr_event_id: row.get(3)?,
        user_id: row.get(4)?,
        kind: enum_col(row, 5)?,
        trigger: enum_col(row, 6)?,
        payload: json_col(row, 7)?,
        recipient: row.get(8)?,
        status: enum_col(row, 9)?,
        scheduled_at: ts(row, 10)?,
        execute_at: ts(row, 11)?,
        processing_started_at: opt_ts(row, 12)?,
        next_retry_at: opt_ts(row, 13)?,
        retry_count: row.get(14)?,
        max_retries: row.get(15)?,
        error_message: row.get(16)?,
        error_details: row.get(17)?,
        external_message_id: row.get(18)?,
    })
}

pub fn insert_tx(conn: &rusqlite::Connection, t: &PendingTask) -> rusqlite::Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO pending_tasks ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9,
             ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)"
        ),
        params![
            t.id,
            t.tenant_id,
            t.booking_id,
            t.meetlr_event_id,
            t.user_id,
            t.kind.to_string(),
            t.trigger.to_string(),
            to_json(&t.payload)?,
            t.recipient,
            t.status.to_string(),
            format_ts(t.scheduled_at),
            format_ts(t.execute_at),
            t.processing_started_at.map(format_ts),
            t.next_retry_at.map(format_ts),
            t.retry_count,
            t.max_retries,
            t.error_message,
            t.error_details,
            t.external_message_id,
        ],
    )?;
    Ok(())
}

pub async fn insert(db: &Database, task: &PendingTask) -> Result<(), MeetlrError> {
    let task = task.clone();
    db.connection()
        .call(move |conn| insert_tx(conn, &task))
        .await
        .map_err(map_tr_err)
}

pub fn get_tx(conn: &rusqlite::Connection, id: &str) -> rusqlite::Result<Option<PendingTask>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM pending_tasks WHERE id = ?1"),
        params![id],
        from_row,
    )
    .optional()
}

pub async fn get(db: &Database, id: &str) -> Result<Option<PendingTask>, MeetlrError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| get_tx(conn, &id))
        .await
        .map_err(map_tr_err)
}

pub async fn list_for_booking(
    db: &Database,
    booking_id: &str,
) -> Result<Vec<PendingTask>, MeetlrError> {
    let booking_id = booking_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM pending_tasks WHERE booking_id = ?1
                 ORDER BY execute_at ASC, kind ASC"
            ))?;
            let rows = stmt.query_map(params![booking_id], from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Claim up to `limit` due rows, marking each as `processing`.
///
/// A row is due when it is queued, or failed with its retry time reached,
/// its `execute_at` has passed, and it still has retries left. Selection and
/// the status flip run in one transaction on the single writer, so a row is
/// claimed at most once until it leaves `processing`.
pub async fn claim_due(
    db: &Database,
    now: DateTime<Utc>,
    limit: usize,
) -> Result<Vec<PendingTask>, MeetlrError> {
    let now_s = format_ts(now);
    let limit = limit as i64;
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let candidates = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {COLUMNS} FROM pending_tasks
                     WHERE (status = 'queued'
                            OR (status = 'failed'
                                AND (next_retry_at IS NULL OR next_retry_at <= ?1)))
                       AND execute_at <= ?1
                       AND retry_count < max_retries
                     ORDER BY execute_at ASC, scheduled_at ASC
                     LIMIT ?2"
                ))?;
                let rows = stmt.query_map(params![now_s, limit], from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            };

            let mut claimed = Vec::with_capacity(candidates.len());
            for mut task in candidates {
                let n = tx.execute(
                    "UPDATE pending_tasks SET status = 'processing', processing_started_at = ?2
                     WHERE id = ?1 AND status IN ('queued', 'failed')",
                    params![task.id, now_s],
                )?;
                if n == 1 {
                    task.status = TaskStatus::Processing;
                    task.processing_started_at = Some(now);
                    claimed.push(task);
                }
            }
            tx.commit()?;
            Ok(claimed)
        })
        .await
        .map_err(map_tr_err)
}

/// Return a claimed row to `failed` with a retry scheduled.
///
/// Returns `false` if the row was no longer `processing`.
pub async fn schedule_retry(
    db: &Database,
    id: &str,
    retry_count: u32,
    next_retry_at: DateTime<Utc>,
    error_message: &str,
    error_details: Option<&str>,
) -> Result<bool, MeetlrError> {
    let id = id.to_string();
    let next_retry_at = format_ts(next_retry_at);
    let error_message = error_message.to_string();
    let error_details = error_details.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let n = conn.execute(
                "UPDATE pending_tasks
                 SET status = 'failed', retry_count = ?2, next_retry_at = ?3,
                     error_message = ?4, error_details = ?5, processing_started_at = NULL
                 WHERE id = ?1 AND status = 'processing'",
                params![id, retry_count, next_retry_at, error_message, error_details],
            )?;
            Ok(n == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Terminal bookkeeping for a task leaving the queue.
#[derive(Debug, Clone)]
pub struct Archive {
    pub final_status: FinalStatus,
    pub failure_category: Option<FailureCategory>,
    pub processed_at: DateTime<Utc>,
    pub processing_time_ms: i64,
}

/// Write the history row and delete the pending row.
///
/// Must run inside the same transaction as any booking mutation the task
/// produced. Returns `false` if the pending row was already gone.
pub fn archive_tx(
    conn: &rusqlite::Connection,
    task: &PendingTask,
    archive: &Archive,
) -> rusqlite::Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM pending_tasks WHERE id = ?1 AND status = 'processing'",
        params![task.id],
    )?;
    if deleted == 0 {
        return Ok(false);
    }
    conn.execute(
        "INSERT INTO task_history (id, tenant_id, booking_id, meetlr_event_id, user_id, kind,
         trigger_kind, payload_json, recipient, scheduled_at, execute_at, retry_count,
         max_retries, error_message, error_details, external_message_id, final_status,
         failure_category, processed_at, processing_time_ms)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
                 ?18, ?19, ?20)",
        params![
            task.id,
            task.tenant_id,
            task.booking_id,
            task.meetlr_event_id,
            task.user_id,
            task.kind.to_string(),
            task.trigger.to_string(),
            to_json(&task.payload)?,
            task.recipient,
            format_ts(task.scheduled_at),
            format_ts(task.execute_at),
            task.retry_count,
            task.max_retries,
            task.error_message,
            task.error_details,
            task.external_message_id,
            archive.final_status.to_string(),
            archive.failure_category.map(|c| c.to_string()),
            format_ts(archive.processed_at),
            archive.processing_time_ms,
        ],
    )?;
    Ok(true)
}

pub async fn archive(
    db: &Database,
    task: &PendingTask,
    archive: Archive,
) -> Result<bool, MeetlrError> {
    let task = task.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let archived = archive_tx(&tx, &task, &archive)?;
            tx.commit()?;
            Ok(archived)
        })
        .await
        .map_err(map_tr_err)
}

/// Requeue rows that have been `processing` since before `cutoff`.
///
/// Recovers rows orphaned by a crash between claim and finalize.
pub async fn requeue_stale(db: &Database, cutoff: DateTime<Utc>) -> Result<usize, MeetlrError> {
    let cutoff = format_ts(cutoff);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE pending_tasks SET status = 'queued', processing_started_at = NULL
                 WHERE status = 'processing' AND processing_started_at < ?1",
                params![cutoff],
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Row counts per status, for gauges and the CLI.
pub async fn count_by_status(db: &Database) -> Result<Vec<(TaskStatus, i64)>, MeetlrError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn
                .prepare("SELECT status, COUNT(*) FROM pending_tasks GROUP BY status ORDER BY status")?;
            let rows = stmt.query_map([], |row| Ok((enum_col(row, 0)?, row.get(1)?)))?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::task_history;
    use crate::testing::{sample_booking, sample_task};
    use chrono::Duration;
    use meetlr_core::TaskKind;

    async fn setup() -> (Database, DateTime<Utc>) {
        let db = Database::open_in_memory().await.unwrap();
        let b = sample_booking("b1");
        crate::queries::bookings::insert(&db, &b).await.unwrap();
        (db, b.created_at)
    }

    #[tokio::test]
    async fn claimed_row_is_not_claimed_twice() {
        let (db, now) = setup().await;
        let t = sample_task("t1", TaskKind::ConfirmationEmail, now);
        insert(&db, &t).await.unwrap();

        let first = claim_due(&db, now, 10).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].status, TaskStatus::Processing);
        assert_eq!(first[0].processing_started_at, Some(now));

        let second = claim_due(&db, now + Duration::minutes(1), 10).await.unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn future_rows_wait_for_execute_at() {
        let (db, now) = setup().await;
        let t = sample_task("t1", TaskKind::ReminderEmail, now)
            .with_execute_at(now + Duration::hours(2));
        insert(&db, &t).await.unwrap();

        assert!(claim_due(&db, now, 10).await.unwrap().is_empty());
        assert!(
            claim_due(&db, now + Duration::minutes(119), 10)
                .await
                .unwrap()
                .is_empty()
        );
        assert_eq!(
            claim_due(&db, now + Duration::hours(2), 10).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn failed_rows_are_claimable_after_retry_time() {
        let (db, now) = setup().await;
        insert(&db, &sample_task("t1", TaskKind::ConfirmationEmail, now))
            .await
            .unwrap();
        claim_due(&db, now, 10).await.unwrap();

        let retry_at = now + Duration::minutes(1);
        assert!(
            schedule_retry(&db, "t1", 1, retry_at, "smtp 451", None)
                .await
                .unwrap()
        );

        let row = get(&db, "t1").await.unwrap().unwrap();
        assert_eq!(row.status, TaskStatus::Failed);
        assert_eq!(row.retry_count, 1);
        assert_eq!(row.error_message.as_deref(), Some("smtp 451"));

        assert!(claim_due(&db, now + Duration::seconds(30), 10).await.unwrap().is_empty());
        let again = claim_due(&db, retry_at, 10).await.unwrap();
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].retry_count, 1);
    }

    #[tokio::test]
    async fn schedule_retry_requires_processing() {
        let (db, now) = setup().await;
        insert(&db, &sample_task("t1", TaskKind::ConfirmationEmail, now))
            .await
            .unwrap();
        let moved = schedule_retry(&db, "t1", 1, now, "boom", None).await.unwrap();
        assert!(!moved);
        assert_eq!(
            get(&db, "t1").await.unwrap().unwrap().status,
            TaskStatus::Queued
        );
    }

    #[tokio::test]
    async fn exhausted_rows_are_invisible() {
        let (db, now) = setup().await;
        let mut t = sample_task("t1", TaskKind::ConfirmationEmail, now);
        t.status = TaskStatus::Failed;
        t.retry_count = 3;
        insert(&db, &t).await.unwrap();
        assert!(claim_due(&db, now + Duration::days(1), 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn archive_moves_row_to_history() {
        let (db, now) = setup().await;
        insert(&db, &sample_task("t1", TaskKind::ConfirmationEmail, now))
            .await
            .unwrap();
        let mut claimed = claim_due(&db, now, 10).await.unwrap();
        let mut task = claimed.remove(0);
        task.external_message_id = Some("msg-1".into());

        let archived = archive(
            &db,
            &task,
            Archive {
                final_status: FinalStatus::Sent,
                failure_category: None,
                processed_at: now + Duration::seconds(2),
                processing_time_ms: 2000,
            },
        )
        .await
        .unwrap();
        assert!(archived);
        assert!(get(&db, "t1").await.unwrap().is_none());

        let history = task_history::get(&db, "t1").await.unwrap().unwrap();
        assert_eq!(history.final_status, FinalStatus::Sent);
        assert_eq!(history.external_message_id.as_deref(), Some("msg-1"));
        assert_eq!(history.processing_time_ms, 2000);

        // A second archive of the same row is a no-op.
        let again = archive(
            &db,
            &task,
            Archive {
                final_status: FinalStatus::Failed,
                failure_category: None,
                processed_at: now,
                processing_time_ms: 0,
            },
        )
        .await
        .unwrap();
        assert!(!again);
    }

    #[tokio::test]
    async fn requeue_stale_recovers_old_leases_only() {
        let (db, now) = setup().await;
        insert(&db, &sample_task("old", TaskKind::ConfirmationEmail, now))
            .await
            .unwrap();
        claim_due(&db, now, 10).await.unwrap();
        insert(&db, &sample_task("fresh", TaskKind::ConfirmationEmail, now))
            .await
            .unwrap();
        claim_due(&db, now + Duration::minutes(9), 10).await.unwrap();

        let requeued = requeue_stale(&db, now + Duration::minutes(5)).await.unwrap();
        assert_eq!(requeued, 1);
        assert_eq!(
            get(&db, "old").await.unwrap().unwrap().status,
            TaskStatus::Queued
        );
        assert_eq!(
            get(&db, "fresh").await.unwrap().unwrap().status,
            TaskStatus::Processing
        );

        let counts = count_by_status(&db).await.unwrap();
        assert!(counts.contains(&(TaskStatus::Queued, 1)));
        assert!(counts.contains(&(TaskStatus::Processing, 1)));
    }
}

// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read access to the append-only task history.

use meetlr_core::{MeetlrError, TaskHistory};
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, map_tr_err};
use crate::queries::row::{enum_col, json_col, opt_enum_col, ts};

const COLUMNS: &str = "id, tenant_id, booking_id, meetlr_event_id, user_id, kind, trigger_kind,
    payload_json, recipient, scheduled_at, execute_at, retry_count, max_retries, error_message,
    error_details, external_message_id, final_status, failure_category, processed_at,
    processing_time_ms";

fn from_row(row: &Row<'_>) -> rusqlite::Result<TaskHistory> {
    Ok(TaskHistory {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        booking_id: row.get(2)?,
        meetlr_event_id: row.get(3)?,
        user_id: row.get(4)?,
        kind: enum_col(row, 5)?,
        trigger: enum_col(row, 6)?,
        payload: json_col(row, 7)?,
        recipient: row.get(8)?,
        scheduled_at: ts(row, 9)?,
        execute_at: ts(row, 10)?,
        retry_count: row.get(11)?,
        max_retries: row.get(12)?,
        error_message: row.get(13)?,
        error_details: row.get(14)?,
        external_message_id: row.get(15)?,
        final_status: enum_col(row, 16)?,
        failure_category: opt_enum_col(row, 17)?,
        processed_at: ts(row, 18)?,
        processing_time_ms: row.get(19)?,
    })
}

pub async fn get(db: &Database, id: &str) -> Result<Option<TaskHistory>, MeetlrError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM task_history WHERE id = ?1"),
                params![id],
                from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_for_booking(
    db: &Database,
    booking_id: &str,
) -> Result<Vec<TaskHistory>, MeetlrError> {
    let booking_id = booking_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM task_history WHERE booking_id = ?1
                 ORDER BY processed_at ASC, kind ASC"
            ))?;
            let rows = stmt.query_map(params![booking_id], from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_recent(db: &Database, limit: usize) -> Result<Vec<TaskHistory>, MeetlrError> {
    let limit = limit as i64;
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM task_history ORDER BY processed_at DESC LIMIT ?1"
            ))?;
            let rows = stmt.query_map(params![limit], from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queries backing the poller's housekeeping jobs.

use chrono::{DateTime, Utc};
use meetlr_core::MeetlrError;
use meetlr_core::time::format_ts;
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, map_tr_err};
use crate::models::{OneTimeCode, SlotInvitation};
use crate::queries::row::{enum_col, opt_ts, ts};

pub async fn insert_one_time_code(db: &Database, code: &OneTimeCode) -> Result<(), MeetlrError> {
    let c = code.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO one_time_codes (id, user_id, purpose, code_hash, expires_at,
                 consumed_at, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    c.id,
                    c.user_id,
                    c.purpose,
                    c.code_hash,
                    format_ts(c.expires_at),
                    c.consumed_at.map(format_ts),
                    format_ts(c.created_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Delete codes that expired or were consumed before `now`.
pub async fn delete_stale_one_time_codes(
    db: &Database,
    now: DateTime<Utc>,
) -> Result<usize, MeetlrError> {
    let now = format_ts(now);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM one_time_codes WHERE expires_at < ?1 OR consumed_at IS NOT NULL",
                params![now],
            )
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_one_time_code(db: &Database, id: &str) -> Result<Option<OneTimeCode>, MeetlrError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, user_id, purpose, code_hash, expires_at, consumed_at, created_at
                 FROM one_time_codes WHERE id = ?1",
                params![id],
                |row| {
                    Ok(OneTimeCode {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        purpose: row.get(2)?,
                        code_hash: row.get(3)?,
                        expires_at: ts(row, 4)?,
                        consumed_at: opt_ts(row, 5)?,
                        created_at: ts(row, 6)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

const SLOT_COLUMNS: &str = "id, tenant_id, meetlr_event_id, host_user_id, invitee_email,
    slot_start, slot_end, status, expires_at, created_at, updated_at";

fn slot_from_row(row: &Row<'_>) -> rusqlite::Result<SlotInvitation> {
    Ok(SlotInvitation {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        meetlr_event_id: row.get(2)?,
        host_user_id: row.get(3)?,
        invitee_email: row.get(4)?,
        slot_start: ts(row, 5)?,
        slot_end: ts(row, 6)?,
        status: enum_col(row, 7)?,
        expires_at: ts(row, 8)?,
        created_at: ts(row, 9)?,
        updated_at: ts(row, 10)?,
    })
}

pub fn insert_slot_invitation_tx(
    conn: &rusqlite::Connection,
    s: &SlotInvitation,
) -> rusqlite::Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO slot_invitations ({SLOT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        ),
        params![
            s.id,
            s.tenant_id,
            s.meetlr_event_id,
            s.host_user_id,
            s.invitee_email,
            format_ts(s.slot_start),
            format_ts(s.slot_end),
            s.status.to_string(),
            format_ts(s.expires_at),
            format_ts(s.created_at),
            format_ts(s.updated_at),
        ],
    )?;
    Ok(())
}

pub async fn get_slot_invitation(
    db: &Database,
    id: &str,
) -> Result<Option<SlotInvitation>, MeetlrError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {SLOT_COLUMNS} FROM slot_invitations WHERE id = ?1"),
                params![id],
                slot_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Mark held invitations past their expiry as expired.
pub async fn expire_slot_invitations(
    db: &Database,
    now: DateTime<Utc>,
) -> Result<usize, MeetlrError> {
    let now = format_ts(now);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE slot_invitations SET status = 'expired', updated_at = ?1
                 WHERE status = 'held' AND expires_at < ?1",
                params![now],
            )
        })
        .await
        .map_err(map_tr_err)
}

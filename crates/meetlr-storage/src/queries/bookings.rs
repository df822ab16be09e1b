// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Booking repository.
//!
//! The `*_tx` functions take a plain connection so callers can compose them
//! inside one transaction with event dispatch and task enqueuing.

use chrono::{DateTime, Utc};
use meetlr_core::time::format_ts;
use meetlr_core::{Booking, BookingUpdate, MeetlrError, PaymentStatus};
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, map_tr_err};
use crate::queries::row::{enum_col, ts};

const COLUMNS: &str = "id, tenant_id, meetlr_event_id, host_user_id, title, attendee_name,
    attendee_email, attendee_phone, start_time, end_time, status, price_cents, currency,
    payment_status, payment_intent_id, location_type, meeting_url, meeting_id,
    calendar_event_id, calendar_schedule_id, auto_calendar_sync, sms_reminders,
    whatsapp_reminders, reschedule_count, cancellation_reason, created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Booking> {
    Ok(Booking {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        meetlr_event_id: row.get(2)?,
        host_user_id: row.get(3)?,
        title: row.get(4)?,
        attendee_name: row.get(5)?,
        attendee_email: row.get(6)?,
        attendee_phone: row.get(7)?,
        start_time: ts(row, 8)?,
        end_time: ts(row, 9)?,
        status: enum_col(row, 10)?,
        price_cents: row.get(11)?,
        currency: row.get(12)?,
        payment_status: enum_col(row, 13)?,
        payment_intent_id: row.get(14)?,
        location_type: row.get(15)?,
        meeting_url: row.get(16)?,
        meeting_id: row.get(17)?,
        calendar_event_id: row.get(18)?,
        calendar_schedule_id: row.get(19)?,
        auto_calendar_sync: row.get(20)?,
        sms_reminders: row.get(21)?,
        whatsapp_reminders: row.get(22)?,
        reschedule_count: row.get(23)?,
        cancellation_reason: row.get(24)?,
        created_at: ts(row, 25)?,
        updated_at: ts(row, 26)?,
    })
}

pub fn insert_tx(conn: &rusqlite::Connection, b: &Booking) -> rusqlite::Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO bookings ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
             ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27)"
        ),
        params![
            b.id,
            b.tenant_id,
            b.meetlr_event_id,
            b.host_user_id,
            b.title,
            b.attendee_name,
            b.attendee_email,
            b.attendee_phone,
            format_ts(b.start_time),
            format_ts(b.end_time),
            b.status.to_string(),
            b.price_cents,
            b.currency,
            b.payment_status.to_string(),
            b.payment_intent_id,
            b.location_type,
            b.meeting_url,
            b.meeting_id,
            b.calendar_event_id,
            b.calendar_schedule_id,
            b.auto_calendar_sync,
            b.sms_reminders,
            b.whatsapp_reminders,
            b.reschedule_count,
            b.cancellation_reason,
            format_ts(b.created_at),
            format_ts(b.updated_at),
        ],
    )?;
    Ok(())
}

/// Persist every mutable column of an existing booking.
pub fn save_tx(conn: &rusqlite::Connection, b: &Booking) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE bookings SET start_time = ?2, end_time = ?3, status = ?4, payment_status = ?5,
         payment_intent_id = ?6, meeting_url = ?7, meeting_id = ?8, calendar_event_id = ?9,
         calendar_schedule_id = ?10, reschedule_count = ?11, cancellation_reason = ?12,
         updated_at = ?13
         WHERE id = ?1",
        params![
            b.id,
            format_ts(b.start_time),
            format_ts(b.end_time),
            b.status.to_string(),
            b.payment_status.to_string(),
            b.payment_intent_id,
            b.meeting_url,
            b.meeting_id,
            b.calendar_event_id,
            b.calendar_schedule_id,
            b.reschedule_count,
            b.cancellation_reason,
            format_ts(b.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_tx(conn: &rusqlite::Connection, id: &str) -> rusqlite::Result<Option<Booking>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM bookings WHERE id = ?1"),
        params![id],
        from_row,
    )
    .optional()
}

/// Load, mutate, and save a booking. Returns `false` if it no longer exists.
pub fn apply_update_tx(
    conn: &rusqlite::Connection,
    id: &str,
    update: &BookingUpdate,
    now: DateTime<Utc>,
) -> rusqlite::Result<bool> {
    match get_tx(conn, id)? {
        Some(mut booking) => {
            booking.apply_update(update, now);
            save_tx(conn, &booking)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

pub async fn insert(db: &Database, booking: &Booking) -> Result<(), MeetlrError> {
    let booking = booking.clone();
    db.connection()
        .call(move |conn| insert_tx(conn, &booking))
        .await
        .map_err(map_tr_err)
}

pub async fn save(db: &Database, booking: &Booking) -> Result<(), MeetlrError> {
    let booking = booking.clone();
    db.connection()
        .call(move |conn| save_tx(conn, &booking))
        .await
        .map_err(map_tr_err)
}

pub async fn get(db: &Database, id: &str) -> Result<Option<Booking>, MeetlrError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| get_tx(conn, &id))
        .await
        .map_err(map_tr_err)
}

/// Ids of pending bookings that still await payment and were created before `cutoff`.
pub async fn list_expired_pending(
    db: &Database,
    cutoff: DateTime<Utc>,
) -> Result<Vec<String>, MeetlrError> {
    let cutoff = format_ts(cutoff);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id FROM bookings
                 WHERE status = 'pending' AND payment_status IN ('pending', 'failed')
                   AND created_at < ?1
                 ORDER BY created_at ASC",
            )?;
            let rows = stmt.query_map(params![cutoff], |row| row.get(0))?;
            rows.collect::<Result<Vec<String>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Bookings whose payment intent has not settled yet.
pub async fn list_awaiting_payment(
    db: &Database,
    limit: usize,
) -> Result<Vec<Booking>, MeetlrError> {
    let limit = limit as i64;
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM bookings
                 WHERE payment_status = 'pending' AND status = 'pending'
                   AND payment_intent_id IS NOT NULL
                 ORDER BY created_at ASC LIMIT ?1"
            ))?;
            let rows = stmt.query_map(params![limit], from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Record a payment status change reported out of band.
pub async fn set_payment_status(
    db: &Database,
    id: &str,
    status: PaymentStatus,
    now: DateTime<Utc>,
) -> Result<bool, MeetlrError> {
    let id = id.to_string();
    let now = format_ts(now);
    db.connection()
        .call(move |conn| {
            let n = conn.execute(
                "UPDATE bookings SET payment_status = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, status.to_string(), now],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_booking;
    use chrono::Duration;
    use meetlr_core::BookingStatus;

    #[tokio::test]
    async fn insert_get_save_lifecycle() {
        let db = Database::open_in_memory().await.unwrap();
        let mut b = sample_booking("b1");
        insert(&db, &b).await.unwrap();

        let loaded = get(&db, "b1").await.unwrap().expect("booking exists");
        assert_eq!(loaded, b);

        b.status = BookingStatus::Cancelled;
        b.cancellation_reason = Some("host sick".into());
        b.updated_at += Duration::minutes(1);
        save(&db, &b).await.unwrap();
        let loaded = get(&db, "b1").await.unwrap().unwrap();
        assert_eq!(loaded.status, BookingStatus::Cancelled);
        assert_eq!(loaded.cancellation_reason.as_deref(), Some("host sick"));

        assert!(get(&db, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn apply_update_persists_meeting_fields() {
        let db = Database::open_in_memory().await.unwrap();
        let b = sample_booking("b1");
        insert(&db, &b).await.unwrap();

        let now = b.updated_at + Duration::minutes(3);
        let applied = db
            .connection()
            .call(move |conn| {
                apply_update_tx(
                    conn,
                    "b1",
                    &BookingUpdate::SetMeeting {
                        url: "https://zoom.example/j/1".into(),
                        id: "zm-1".into(),
                    },
                    now,
                )
            })
            .await
            .unwrap();
        assert!(applied);

        let loaded = get(&db, "b1").await.unwrap().unwrap();
        assert_eq!(loaded.meeting_id.as_deref(), Some("zm-1"));
        assert_eq!(loaded.updated_at, now);
    }

    #[tokio::test]
    async fn expired_pending_filters_by_age_and_payment() {
        let db = Database::open_in_memory().await.unwrap();
        let mut old = sample_booking("old");
        old.status = BookingStatus::Pending;
        old.payment_status = PaymentStatus::Pending;
        let created = old.created_at;
        insert(&db, &old).await.unwrap();

        let mut paid = sample_booking("paid");
        paid.status = BookingStatus::Pending;
        paid.payment_status = PaymentStatus::Completed;
        insert(&db, &paid).await.unwrap();

        let ids = list_expired_pending(&db, created + Duration::hours(2))
            .await
            .unwrap();
        assert_eq!(ids, vec!["old".to_string()]);

        let none = list_expired_pending(&db, created).await.unwrap();
        assert!(none.is_empty());
    }
}

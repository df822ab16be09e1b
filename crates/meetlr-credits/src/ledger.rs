// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credit ledger with two-phase reservations.
//!
//! A reservation debits the balance up front and is keyed by the entity it
//! pays for (a pending task id). Confirming consumes it; refunding returns
//! the credits. The unique key on `related_entity_id` makes repeated
//! reservations for the same entity charge once.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use meetlr_core::time::format_ts;
use meetlr_core::types::{CreditReservation, ReservationStatus};
use meetlr_core::{Clock, CreditGate, MeetlrError, ReservationOutcome, ServiceType, SystemClock};
use meetlr_storage::{Database, map_tr_err};
use rusqlite::{OptionalExtension, params};
use tracing::{debug, info, warn};

/// Persistent credit ledger backed by SQLite.
///
/// All operations go through the shared tokio-rusqlite writer thread.
pub struct CreditLedger {
    conn: tokio_rusqlite::Connection,
    clock: Arc<dyn Clock>,
}

impl CreditLedger {
    /// Create a ledger over an existing connection.
    pub fn new(conn: tokio_rusqlite::Connection) -> Self {
        Self::with_clock(conn, Arc::new(SystemClock))
    }

    pub fn with_clock(conn: tokio_rusqlite::Connection, clock: Arc<dyn Clock>) -> Self {
        Self { conn, clock }
    }

    /// Share the pipeline database's writer connection.
    pub fn from_database(db: &Database, clock: Arc<dyn Clock>) -> Self {
        Self::with_clock(db.connection().clone(), clock)
    }

    /// Add credits to a user's balance (top-up).
    pub async fn grant_credits(
        &self,
        user_id: &str,
        service: ServiceType,
        credits: i64,
    ) -> Result<i64, MeetlrError> {
        let user_id = user_id.to_string();
        let now = format_ts(self.clock.now());
        let balance = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO credit_balances (user_id, service_type, balance, updated_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT (user_id, service_type)
                     DO UPDATE SET balance = balance + excluded.balance,
                                   updated_at = excluded.updated_at",
                    params![user_id, service.to_string(), credits, now],
                )?;
                conn.query_row(
                    "SELECT balance FROM credit_balances WHERE user_id = ?1 AND service_type = ?2",
                    params![user_id, service.to_string()],
                    |row| row.get::<_, i64>(0),
                )
            })
            .await
            .map_err(map_tr_err)?;
        info!(service = %service, credits, balance, "credits granted");
        Ok(balance)
    }

    /// Current balance, zero when the user has never been granted credits.
    pub async fn balance(&self, user_id: &str, service: ServiceType) -> Result<i64, MeetlrError> {
        let user_id = user_id.to_string();
        self.conn
            .call(move |conn| {
                let balance = conn
                    .query_row(
                        "SELECT balance FROM credit_balances
                         WHERE user_id = ?1 AND service_type = ?2",
                        params![user_id, service.to_string()],
                        |row| row.get::<_, i64>(0),
                    )
                    .optional()?;
                Ok(balance.unwrap_or(0))
            })
            .await
            .map_err(map_tr_err)
    }

    /// The reservation held for an entity, if any.
    pub async fn reservation(
        &self,
        related_entity_id: &str,
    ) -> Result<Option<CreditReservation>, MeetlrError> {
        let related = related_entity_id.to_string();
        let row = self
            .conn
            .call(move |conn| {
                conn.query_row(
                    "SELECT id, user_id, service_type, related_entity_id, credits, status,
                            description, created_at, updated_at
                     FROM credit_reservations WHERE related_entity_id = ?1",
                    params![related],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, i64>(4)?,
                            row.get::<_, String>(5)?,
                            row.get::<_, String>(6)?,
                            row.get::<_, String>(7)?,
                            row.get::<_, String>(8)?,
                        ))
                    },
                )
                .optional()
            })
            .await
            .map_err(map_tr_err)?;

        let Some((id, user_id, service, related_entity_id, credits, status, description, c, u)) =
            row
        else {
            return Ok(None);
        };
        Ok(Some(CreditReservation {
            id,
            user_id,
            service_type: parse_enum(&service)?,
            related_entity_id,
            credits,
            status: parse_enum(&status)?,
            description,
            created_at: meetlr_core::time::parse_ts(&c)?,
            updated_at: meetlr_core::time::parse_ts(&u)?,
        }))
    }
}

fn parse_enum<T: FromStr<Err = strum::ParseError>>(raw: &str) -> Result<T, MeetlrError> {
    T::from_str(raw).map_err(|e| MeetlrError::Internal(format!("bad enum value '{raw}': {e}")))
}

/// Debit `credits` if the balance covers it. Returns `false` when it does not.
fn try_debit(
    conn: &rusqlite::Connection,
    user_id: &str,
    service: ServiceType,
    credits: i64,
    now: &str,
) -> rusqlite::Result<bool> {
    if credits <= 0 {
        return Ok(true);
    }
    let n = conn.execute(
        "UPDATE credit_balances SET balance = balance - ?3, updated_at = ?4
         WHERE user_id = ?1 AND service_type = ?2 AND balance >= ?3",
        params![user_id, service.to_string(), credits, now],
    )?;
    Ok(n == 1)
}

#[async_trait]
impl CreditGate for CreditLedger {
    /// Reserve `credits` for `related_entity_id`.
    ///
    /// A `reserved` or `confirmed` row is returned as is without a debit. A
    /// `refunded` row is debited again and goes back to `reserved`: its
    /// credits were already returned, so a later attempt for the same task
    /// pays once more instead of sending for free.
    async fn reserve_credits(
        &self,
        user_id: &str,
        service: ServiceType,
        related_entity_id: &str,
        credits: i64,
        description: &str,
    ) -> Result<ReservationOutcome, MeetlrError> {
        let user_id = user_id.to_string();
        let related = related_entity_id.to_string();
        let description = description.to_string();
        let now = format_ts(self.clock.now());

        let outcome = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let existing: Option<String> = tx
                    .query_row(
                        "SELECT status FROM credit_reservations WHERE related_entity_id = ?1",
                        params![related],
                        |row| row.get(0),
                    )
                    .optional()?;

                let outcome = match existing.as_deref() {
                    Some("reserved") => ReservationOutcome {
                        success: true,
                        already_charged: true,
                        already_sent: false,
                    },
                    Some("confirmed") => ReservationOutcome {
                        success: true,
                        already_charged: true,
                        already_sent: true,
                    },
                    // Credits were handed back earlier; charge again on the same row.
                    Some(_) => {
                        if try_debit(&tx, &user_id, service, credits, &now)? {
                            tx.execute(
                                "UPDATE credit_reservations
                                 SET status = 'reserved', credits = ?2, updated_at = ?3
                                 WHERE related_entity_id = ?1",
                                params![related, credits, now],
                            )?;
                            ReservationOutcome::RESERVED
                        } else {
                            ReservationOutcome::INSUFFICIENT
                        }
                    }
                    None => {
                        if try_debit(&tx, &user_id, service, credits, &now)? {
                            tx.execute(
                                "INSERT INTO credit_reservations (id, user_id, service_type,
                                 related_entity_id, credits, status, description, created_at,
                                 updated_at)
                                 VALUES (?1, ?2, ?3, ?4, ?5, 'reserved', ?6, ?7, ?7)",
                                params![
                                    uuid::Uuid::new_v4().to_string(),
                                    user_id,
                                    service.to_string(),
                                    related,
                                    credits,
                                    description,
                                    now,
                                ],
                            )?;
                            ReservationOutcome::RESERVED
                        } else {
                            ReservationOutcome::INSUFFICIENT
                        }
                    }
                };
                tx.commit()?;
                Ok(outcome)
            })
            .await
            .map_err(map_tr_err)?;

        if outcome.success {
            debug!(related_entity_id, service = %service, ?outcome, "credits reserved");
        } else {
            warn!(related_entity_id, service = %service, credits, "insufficient credits");
        }
        Ok(outcome)
    }

    async fn confirm_credits_used(&self, related_entity_id: &str) -> Result<bool, MeetlrError> {
        let related = related_entity_id.to_string();
        let now = format_ts(self.clock.now());
        self.conn
            .call(move |conn| {
                let n = conn.execute(
                    "UPDATE credit_reservations SET status = 'confirmed', updated_at = ?2
                     WHERE related_entity_id = ?1 AND status = 'reserved'",
                    params![related, now],
                )?;
                Ok(n == 1)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn refund_credits(&self, related_entity_id: &str) -> Result<bool, MeetlrError> {
        let related = related_entity_id.to_string();
        let now = format_ts(self.clock.now());
        let refunded = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let held: Option<(String, String, i64)> = tx
                    .query_row(
                        "SELECT user_id, service_type, credits FROM credit_reservations
                         WHERE related_entity_id = ?1 AND status = 'reserved'",
                        params![related],
                        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                    )
                    .optional()?;
                let Some((user_id, service, credits)) = held else {
                    return Ok(false);
                };
                tx.execute(
                    "UPDATE credit_reservations SET status = 'refunded', updated_at = ?2
                     WHERE related_entity_id = ?1",
                    params![related, now],
                )?;
                tx.execute(
                    "INSERT INTO credit_balances (user_id, service_type, balance, updated_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT (user_id, service_type)
                     DO UPDATE SET balance = balance + excluded.balance,
                                   updated_at = excluded.updated_at",
                    params![user_id, service, credits, now],
                )?;
                tx.commit()?;
                Ok(true)
            })
            .await
            .map_err(map_tr_err)?;
        if refunded {
            info!(related_entity_id, "reserved credits refunded");
        }
        Ok(refunded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn ledger_with(balance: i64) -> (Database, CreditLedger) {
        let db = Database::open_in_memory().await.unwrap();
        let ledger = CreditLedger::new(db.connection().clone());
        if balance > 0 {
            ledger
                .grant_credits("host", ServiceType::Email, balance)
                .await
                .unwrap();
        }
        (db, ledger)
    }

    #[tokio::test]
    async fn duplicate_reservation_debits_once() {
        let (_db, ledger) = ledger_with(5).await;

        let first = ledger
            .reserve_credits("host", ServiceType::Email, "task-1", 1, "confirmation")
            .await
            .unwrap();
        assert_eq!(first, ReservationOutcome::RESERVED);

        let second = ledger
            .reserve_credits("host", ServiceType::Email, "task-1", 1, "confirmation")
            .await
            .unwrap();
        assert!(second.success);
        assert!(second.already_charged);
        assert!(!second.already_sent);

        assert_eq!(ledger.balance("host", ServiceType::Email).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn confirmed_reservation_reports_already_sent() {
        let (_db, ledger) = ledger_with(2).await;
        ledger
            .reserve_credits("host", ServiceType::Email, "task-1", 1, "")
            .await
            .unwrap();
        assert!(ledger.confirm_credits_used("task-1").await.unwrap());
        assert!(!ledger.confirm_credits_used("task-1").await.unwrap());

        let again = ledger
            .reserve_credits("host", ServiceType::Email, "task-1", 1, "")
            .await
            .unwrap();
        assert!(again.already_sent);
        assert_eq!(ledger.balance("host", ServiceType::Email).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn insufficient_balance_creates_nothing() {
        let (_db, ledger) = ledger_with(0).await;
        let outcome = ledger
            .reserve_credits("host", ServiceType::Email, "task-1", 1, "")
            .await
            .unwrap();
        assert_eq!(outcome, ReservationOutcome::INSUFFICIENT);
        assert!(ledger.reservation("task-1").await.unwrap().is_none());
        assert_eq!(ledger.balance("host", ServiceType::Email).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn refund_restores_balance_once() {
        let (_db, ledger) = ledger_with(3).await;
        ledger
            .reserve_credits("host", ServiceType::Email, "task-1", 2, "")
            .await
            .unwrap();
        assert_eq!(ledger.balance("host", ServiceType::Email).await.unwrap(), 1);

        assert!(ledger.refund_credits("task-1").await.unwrap());
        assert!(!ledger.refund_credits("task-1").await.unwrap());
        assert_eq!(ledger.balance("host", ServiceType::Email).await.unwrap(), 3);

        let r = ledger.reservation("task-1").await.unwrap().unwrap();
        assert_eq!(r.status, ReservationStatus::Refunded);
    }

    #[tokio::test]
    async fn refunded_reservation_can_be_charged_again() {
        let (_db, ledger) = ledger_with(1).await;
        ledger
            .reserve_credits("host", ServiceType::Email, "task-1", 1, "")
            .await
            .unwrap();
        ledger.refund_credits("task-1").await.unwrap();

        let again = ledger
            .reserve_credits("host", ServiceType::Email, "task-1", 1, "")
            .await
            .unwrap();
        assert_eq!(again, ReservationOutcome::RESERVED);
        assert_eq!(ledger.balance("host", ServiceType::Email).await.unwrap(), 0);
        assert_eq!(
            ledger.reservation("task-1").await.unwrap().unwrap().status,
            ReservationStatus::Reserved
        );
    }

    #[tokio::test]
    async fn confirmed_reservation_is_not_refunded() {
        let (_db, ledger) = ledger_with(1).await;
        ledger
            .reserve_credits("host", ServiceType::Email, "task-1", 1, "")
            .await
            .unwrap();
        ledger.confirm_credits_used("task-1").await.unwrap();
        assert!(!ledger.refund_credits("task-1").await.unwrap());
        assert_eq!(ledger.balance("host", ServiceType::Email).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn balances_are_per_service() {
        let (_db, ledger) = ledger_with(1).await;
        let sms = ledger
            .reserve_credits("host", ServiceType::Sms, "task-sms", 1, "")
            .await
            .unwrap();
        assert!(!sms.success);
    }
}

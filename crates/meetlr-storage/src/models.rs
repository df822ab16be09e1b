// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage-only entities swept by maintenance jobs.
//!
//! Pipeline entities (bookings, pending tasks, history, reservations) are
//! defined in `meetlr-core::types` and re-exported here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub use meetlr_core::types::{Booking, CreditReservation, PendingTask, TaskHistory};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SlotInvitationStatus {
    Held,
    Accepted,
    Expired,
}

/// A provisional hold on a slot offered to an invitee before any booking exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotInvitation {
    pub id: String,
    pub tenant_id: String,
    pub meetlr_event_id: String,
    pub host_user_id: String,
    pub invitee_email: String,
    pub slot_start: DateTime<Utc>,
    pub slot_end: DateTime<Utc>,
    pub status: SlotInvitationStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A hashed verification code (login links, email verification).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneTimeCode {
    pub id: String,
    pub user_id: String,
    pub purpose: String,
    pub code_hash: String,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Booking lifecycle events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Booking, LifecycleKind};

/// Kind-specific detail carried by a [`LifecycleEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LifecycleDetail {
    Created,
    Completed,
    Cancelled {
        reason: Option<String>,
        payment_involved: bool,
    },
    Rescheduled {
        old_start: DateTime<Utc>,
        old_end: DateTime<Utc>,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
    },
}

/// A booking state transition, raised once per transition and consumed
/// within the same unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub booking_id: String,
    pub meetlr_event_id: String,
    pub host_user_id: String,
    pub tenant_id: String,
    pub occurred_at: DateTime<Utc>,
    pub detail: LifecycleDetail,
}

impl LifecycleEvent {
    pub fn new(booking: &Booking, detail: LifecycleDetail, occurred_at: DateTime<Utc>) -> Self {
        Self {
            booking_id: booking.id.clone(),
            meetlr_event_id: booking.meetlr_event_id.clone(),
            host_user_id: booking.host_user_id.clone(),
            tenant_id: booking.tenant_id.clone(),
            occurred_at,
            detail,
        }
    }

    pub fn kind(&self) -> LifecycleKind {
        match self.detail {
            LifecycleDetail::Created => LifecycleKind::Created,
            LifecycleDetail::Completed => LifecycleKind::Completed,
            LifecycleDetail::Cancelled { .. } => LifecycleKind::Cancelled,
            LifecycleDetail::Rescheduled { .. } => LifecycleKind::Rescheduled,
        }
    }
}

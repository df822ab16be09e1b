// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slot invitations: a held slot offered to an invitee before any booking
//! exists, announced by a `SlotInvitationEmail` task.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use meetlr_core::time::format_ts;
use meetlr_core::{Clock, MeetlrError, PendingTask, TaskKind, TaskPayload, TaskTrigger};
use meetlr_storage::database::flatten_tr_err;
use meetlr_storage::queries::{maintenance, pending_tasks};
use meetlr_storage::{Database, SlotInvitation, SlotInvitationStatus};
use tracing::info;

use crate::policy::Policies;

/// Request to hold a slot for an invitee.
#[derive(Debug, Clone)]
pub struct SlotOffer {
    pub tenant_id: String,
    pub meetlr_event_id: String,
    pub host_user_id: String,
    pub title: String,
    pub invitee_email: String,
    pub slot_start: DateTime<Utc>,
    pub slot_end: DateTime<Utc>,
}

pub struct SlotInvitationService {
    db: Arc<Database>,
    clock: Arc<dyn Clock>,
    policies: Policies,
}

impl SlotInvitationService {
    pub fn new(db: Arc<Database>, clock: Arc<dyn Clock>, policies: Policies) -> Self {
        Self {
            db,
            clock,
            policies,
        }
    }

    /// Hold the slot and enqueue the invitation email in one transaction.
    pub async fn invite(
        &self,
        offer: SlotOffer,
    ) -> Result<(SlotInvitation, PendingTask), MeetlrError> {
        if offer.slot_end <= offer.slot_start {
            return Err(meetlr_core::BookingError::InvalidTimeRange.into());
        }
        let now = self.clock.now();
        let invitation = SlotInvitation {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: offer.tenant_id.clone(),
            meetlr_event_id: offer.meetlr_event_id.clone(),
            host_user_id: offer.host_user_id.clone(),
            invitee_email: offer.invitee_email.clone(),
            slot_start: offer.slot_start,
            slot_end: offer.slot_end,
            status: SlotInvitationStatus::Held,
            expires_at: now + self.policies.booking.slot_hold,
            created_at: now,
            updated_at: now,
        };

        let mut variables = BTreeMap::new();
        variables.insert("title".to_string(), offer.title.clone());
        variables.insert("start_time".to_string(), format_ts(offer.slot_start));
        variables.insert("end_time".to_string(), format_ts(offer.slot_end));
        variables.insert("expires_at".to_string(), format_ts(invitation.expires_at));
        variables.insert("invitation_id".to_string(), invitation.id.clone());

        let task = PendingTask::new(
            &offer.tenant_id,
            None,
            &offer.meetlr_event_id,
            &offer.host_user_id,
            TaskKind::SlotInvitationEmail,
            TaskTrigger::SlotInvitation,
            TaskPayload::Notification {
                template: TaskKind::SlotInvitationEmail,
                subject: format!("A slot is held for you: {}", offer.title),
                variables,
            },
            now,
        )
        .with_recipient(&offer.invitee_email)
        .with_max_retries(self.policies.tasks.max_retries);

        let (inv, t) = (invitation.clone(), task.clone());
        self.db
            .connection()
            .call(move |conn| {
                let tx = conn.transaction().map_err(MeetlrError::storage)?;
                maintenance::insert_slot_invitation_tx(&tx, &inv).map_err(MeetlrError::storage)?;
                pending_tasks::insert_tx(&tx, &t).map_err(MeetlrError::storage)?;
                tx.commit().map_err(MeetlrError::storage)
            })
            .await
            .map_err(flatten_tr_err)?;

        info!(
            invitation_id = %invitation.id,
            task_id = %task.id,
            expires_at = %invitation.expires_at,
            "slot invitation held"
        );
        Ok((invitation, task))
    }
}

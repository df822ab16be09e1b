// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Video meeting provisioning and teardown.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use meetlr_core::types::MeetingRequest;
use meetlr_core::{
    Booking, BookingStatus, BookingUpdate, MeetingProvider, PendingTask, TaskKind, TaskPayload,
};
use tracing::debug;

use crate::executor::{ExecutionError, ExecutionOutcome, TaskExecutor};
use crate::executors::{payload_mismatch, require_booking};

pub struct VideoMeetingCreateExecutor {
    provider: Arc<dyn MeetingProvider>,
    /// Location type to meeting plugin id.
    plugins: BTreeMap<String, String>,
}

impl VideoMeetingCreateExecutor {
    pub fn new(provider: Arc<dyn MeetingProvider>, plugins: BTreeMap<String, String>) -> Self {
        Self { provider, plugins }
    }
}

#[async_trait]
impl TaskExecutor for VideoMeetingCreateExecutor {
    fn name(&self) -> &'static str {
        "video_meeting_create"
    }

    fn kinds(&self) -> &'static [TaskKind] {
        &[TaskKind::VideoMeetingCreate]
    }

    async fn execute(
        &self,
        task: &PendingTask,
        booking: Option<&Booking>,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        let TaskPayload::VideoMeeting {
            location_type,
            title,
            start,
            end,
            ..
        } = &task.payload
        else {
            return Err(payload_mismatch(task));
        };
        let booking = require_booking(task, booking)?;
        if booking.status == BookingStatus::Cancelled {
            return Err(ExecutionError::permanent(
                "booking cancelled before the meeting was created",
            ));
        }
        if booking.meeting_url.is_some() {
            debug!(task_id = %task.id, booking_id = %booking.id, "meeting already provisioned");
            return Ok(ExecutionOutcome::done());
        }
        let plugin_id = self.plugins.get(location_type).ok_or_else(|| {
            ExecutionError::permanent(format!("no meeting plugin for location type {location_type}"))
        })?;

        let info = self
            .provider
            .create_meeting(MeetingRequest {
                plugin_id: plugin_id.clone(),
                user_id: task.user_id.clone(),
                booking_id: booking.id.clone(),
                title: title.clone(),
                start: *start,
                end: *end,
            })
            .await?;
        Ok(ExecutionOutcome::with_update(BookingUpdate::SetMeeting {
            url: info.join_url,
            id: info.meeting_id.clone(),
        })
        .external_id(info.meeting_id))
    }
}

pub struct VideoMeetingDeleteExecutor {
    provider: Arc<dyn MeetingProvider>,
}

impl VideoMeetingDeleteExecutor {
    pub fn new(provider: Arc<dyn MeetingProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl TaskExecutor for VideoMeetingDeleteExecutor {
    fn name(&self) -> &'static str {
        "video_meeting_delete"
    }

    fn kinds(&self) -> &'static [TaskKind] {
        &[TaskKind::VideoMeetingDelete]
    }

    async fn execute(
        &self,
        task: &PendingTask,
        booking: Option<&Booking>,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        let TaskPayload::VideoMeeting { meeting_id, .. } = &task.payload else {
            return Err(payload_mismatch(task));
        };
        let Some(meeting_id) = meeting_id.as_deref().filter(|id| !id.is_empty()) else {
            debug!(task_id = %task.id, "no meeting to delete");
            return Ok(ExecutionOutcome::done());
        };
        if booking.is_some_and(|b| b.meeting_id.is_none()) {
            debug!(task_id = %task.id, "meeting already cleared on booking");
            return Ok(ExecutionOutcome::done());
        }

        if !self.provider.delete_meeting(meeting_id, &task.user_id).await? {
            return Err(ExecutionError::transient(format!(
                "provider refused to delete meeting {meeting_id}"
            )));
        }
        let current = booking.is_some_and(|b| b.meeting_id.as_deref() == Some(meeting_id));
        Ok(if current {
            ExecutionOutcome::with_update(BookingUpdate::ClearMeeting)
        } else {
            ExecutionOutcome::done()
        })
    }
}

// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Calendar sync across the host's connected calendars.

use async_trait::async_trait;

use crate::error::MeetlrError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{CalendarEventRequest, CalendarResult};

#[async_trait]
pub trait CalendarProvider: PluginAdapter {
    /// Creates the event on every connected calendar, one result per calendar.
    async fn create_event(
        &self,
        request: CalendarEventRequest,
    ) -> Result<Vec<CalendarResult>, MeetlrError>;

    async fn delete_event(&self, schedule_id: &str, event_id: &str) -> Result<bool, MeetlrError>;
}

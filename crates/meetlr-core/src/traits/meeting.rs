// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Video meeting provider (multiplexes plugins by plugin id).

use async_trait::async_trait;

use crate::error::MeetlrError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{MeetingInfo, MeetingRequest};

#[async_trait]
pub trait MeetingProvider: PluginAdapter {
    async fn create_meeting(&self, request: MeetingRequest) -> Result<MeetingInfo, MeetlrError>;

    /// Returns `false` when the provider refused the deletion.
    async fn delete_meeting(&self, meeting_id: &str, user_id: &str) -> Result<bool, MeetlrError>;
}

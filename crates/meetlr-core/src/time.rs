// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical timestamp text format for persisted columns.
//!
//! Fixed-width UTC with millisecond precision, so lexical order in SQL
//! matches chronological order.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::MeetlrError;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

pub fn format_ts(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_ts(s: &str) -> Result<DateTime<Utc>, MeetlrError> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| MeetlrError::Internal(format!("invalid timestamp '{s}': {e}")))
}

// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Meetlr task pipeline.

use thiserror::Error;

/// The primary error type used across Meetlr crates and collaborator traits.
#[derive(Debug, Error)]
pub enum MeetlrError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A persisted JSON column could not be encoded or decoded.
    #[error("serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    /// A booking lifecycle rule was violated.
    #[error(transparent)]
    Booking(#[from] BookingError),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// External collaborator errors (mail relay, meeting plugin, payment processor).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MeetlrError {
    /// Shorthand for a provider error with no underlying source.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a storage error wrapping any error type.
    pub fn storage(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage {
            source: Box::new(source),
        }
    }
}

/// Rejections raised synchronously by booking state transitions.
///
/// None of these produce a lifecycle event or any pending task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingError {
    #[error("booking {0} is already cancelled")]
    AlreadyCancelled(String),

    #[error("booking {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: String,
        to: String,
    },

    #[error("booking {id} has already been rescheduled {count} time(s)")]
    AlreadyRescheduled { id: String, count: u32 },

    #[error("booking {id} cannot be rescheduled within {notice_hours}h of the new start")]
    WithinNoticeWindow { id: String, notice_hours: i64 },

    #[error("booking {0} requires a completed payment before confirmation")]
    PaymentIncomplete(String),

    #[error("end time must be after start time")]
    InvalidTimeRange,
}

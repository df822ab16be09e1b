// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The executor contract and the delivery error taxonomy.

use async_trait::async_trait;
use meetlr_core::{
    Booking, BookingUpdate, FailureCategory, MeetlrError, PendingTask, ServiceType, TaskKind,
};
use thiserror::Error;

/// What a successful execution produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub external_id: Option<String>,
    /// Applied to the booking in the transaction that archives the task.
    pub booking_update: Option<BookingUpdate>,
    /// Set when the side effect was deliberately not performed.
    pub skipped: Option<String>,
}

impl ExecutionOutcome {
    /// Nothing to report beyond success.
    pub fn done() -> Self {
        Self::default()
    }

    pub fn sent(external_id: Option<String>) -> Self {
        Self {
            external_id,
            ..Self::default()
        }
    }

    pub fn with_update(update: BookingUpdate) -> Self {
        Self {
            booking_update: Some(update),
            ..Self::default()
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            skipped: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn external_id(mut self, id: impl Into<String>) -> Self {
        self.external_id = Some(id.into());
        self
    }
}

/// Why an execution did not succeed. Only `Transient` consumes a retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("{0}")]
    Transient(String),

    #[error("{0}")]
    Permanent(String),

    #[error("insufficient {service} credits: {required} required")]
    InsufficientCredits { service: ServiceType, required: i64 },
}

impl ExecutionError {
    pub fn category(&self) -> FailureCategory {
        match self {
            Self::Transient(_) => FailureCategory::Transient,
            Self::Permanent(_) => FailureCategory::Permanent,
            Self::InsufficientCredits { .. } => FailureCategory::InsufficientCredits,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent(message.into())
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }
}

/// Collaborator and storage hiccups are worth retrying; malformed data is not.
impl From<MeetlrError> for ExecutionError {
    fn from(e: MeetlrError) -> Self {
        match e {
            MeetlrError::Provider { .. } | MeetlrError::Timeout { .. } | MeetlrError::Storage { .. } => {
                Self::Transient(e.to_string())
            }
            MeetlrError::Config(_)
            | MeetlrError::Serialization { .. }
            | MeetlrError::Booking(_)
            | MeetlrError::NotFound { .. }
            | MeetlrError::Internal(_) => Self::Permanent(e.to_string()),
        }
    }
}

/// Performs the side effect of one or more task kinds.
///
/// Implementations re-check their domain preconditions against the current
/// booking and must be safe to run more than once for the same task.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Stable name used in logs.
    fn name(&self) -> &'static str;

    fn kinds(&self) -> &'static [TaskKind];

    async fn execute(
        &self,
        task: &PendingTask,
        booking: Option<&Booking>,
    ) -> Result<ExecutionOutcome, ExecutionError>;

    /// Called once the task is archived as failed.
    async fn on_terminal_failure(&self, _task: &PendingTask) -> Result<(), MeetlrError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_errors_are_transient_and_not_found_is_permanent() {
        let t: ExecutionError = MeetlrError::provider("503").into();
        assert_eq!(t.category(), FailureCategory::Transient);

        let p: ExecutionError = MeetlrError::NotFound {
            entity: "booking",
            id: "b1".into(),
        }
        .into();
        assert_eq!(p.category(), FailureCategory::Permanent);
    }

    #[test]
    fn insufficient_credits_has_its_own_category() {
        let e = ExecutionError::InsufficientCredits {
            service: ServiceType::Sms,
            required: 2,
        };
        assert_eq!(e.category(), FailureCategory::InsufficientCredits);
        assert_eq!(e.to_string(), "insufficient sms credits: 2 required");
    }
}

// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pending task execution for the Meetlr pipeline.
//!
//! [`TaskDispatcher`] claims due rows from the pending task store, hands each
//! to the [`TaskExecutor`] registered for its kind, and finalizes the row:
//! archived as sent, returned for a backed-off retry, or archived as failed.

pub mod dispatch;
pub mod executor;
pub mod executors;
pub mod registry;
pub mod retry;
pub mod templates;

pub use dispatch::{DrainReport, TaskDispatcher};
pub use executor::{ExecutionError, ExecutionOutcome, TaskExecutor};
pub use registry::ExecutorRegistry;
pub use retry::RetryPolicy;

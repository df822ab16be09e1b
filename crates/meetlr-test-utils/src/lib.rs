// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Meetlr integration tests.
//!
//! Provides mock collaborators and database harnesses for fast,
//! deterministic tests without external services.
//!
//! # Components
//!
//! - [`MockSender`] - Notification sender that records messages and can fail on demand
//! - [`MockMeetingProvider`], [`MockCalendarProvider`], [`MockPaymentProvider`] - Scripted providers
//! - [`ManualClock`] - Clock advanced explicitly by the test
//! - [`TestDatabase`] - Migrated SQLite database in a temp directory

pub mod clock;
pub mod fixtures;
pub mod harness;
pub mod mock_providers;
pub mod mock_sender;

pub use clock::ManualClock;
pub use harness::TestDatabase;
pub use mock_providers::{MockCalendarProvider, MockMeetingProvider, MockPaymentProvider};
pub use mock_sender::MockSender;

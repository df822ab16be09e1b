// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator trait definitions.
//!
//! Every external side effect the pipeline performs goes through one of
//! these traits. All use `#[async_trait]` for dynamic dispatch.

pub mod adapter;
pub mod calendar;
pub mod credits;
pub mod meeting;
pub mod notification;
pub mod payment;

pub use adapter::PluginAdapter;
pub use calendar::CalendarProvider;
pub use credits::CreditGate;
pub use meeting::MeetingProvider;
pub use notification::NotificationSender;
pub use payment::PaymentProvider;

// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Booking lifecycle transitions and post-event task enqueuing.
//!
//! [`BookingService`] is the only write path for bookings: every transition
//! commits together with the pending tasks its lifecycle event fans out to.

pub mod aggregate;
pub mod dispatcher;
pub mod handlers;
pub mod policy;
pub mod service;
pub mod slots;

pub use aggregate::{BookingLifecycle, NewBooking};
pub use dispatcher::{EnqueueContext, EventDispatcher, EventHandler, HandlerOutput};
pub use policy::{BookingPolicy, Policies, TaskPolicy};
pub use service::{BookingService, HandlerFailure, TransitionReport};
pub use slots::{SlotInvitationService, SlotOffer};

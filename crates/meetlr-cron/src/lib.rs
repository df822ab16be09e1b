// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scheduled poller and maintenance jobs for the Meetlr pipeline.

pub mod cadence;
pub mod jobs;
pub mod poller;

pub use cadence::Cadence;
pub use jobs::MaintenanceJob;
pub use poller::{Poller, PollerDeps, TickReport};

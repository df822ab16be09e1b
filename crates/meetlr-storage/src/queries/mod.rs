// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules over the pipeline schema.

pub mod bookings;
pub mod maintenance;
pub mod pending_tasks;
pub(crate) mod row;
pub mod task_history;

// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Meetlr task pipeline.
//!
//! WAL-mode SQLite with embedded migrations and a single-writer model via
//! `tokio-rusqlite`. Query modules expose synchronous `*_tx` functions for
//! composing one unit of work, plus async wrappers for standalone calls.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::{Database, flatten_tr_err, map_tr_err};
pub use models::*;

// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credit accounting for metered notifications.
//!
//! - **Ledger**: per-user, per-channel balances and idempotent reservations
//!   implementing [`meetlr_core::CreditGate`]
//! - **Pricing**: per-channel message cost from configuration

pub mod ledger;
pub mod pricing;

pub use ledger::CreditLedger;
pub use pricing::credit_cost;

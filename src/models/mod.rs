// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod balance;
pub mod ledger;
pub mod reward;
pub mod spin;

pub use balance::BalanceProjection;
pub use ledger::{EntryDetail, EntryKind, LedgerEntry};
pub use reward::Reward;
pub use spin::{OutcomeTable, SpinOutcome, SpinRecord};

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod award;
pub mod cache;
pub mod catalog;
pub mod expiration;
pub mod payout;
pub mod redemption;
pub mod spin;
pub mod tier;

pub use award::{AwardResult, AwardService};
pub use cache::TtlCache;
pub use catalog::{CatalogError, RewardCatalog};
pub use expiration::{run_sweep, SweepSummary};
pub use payout::{PayoutMonitor, PayoutReport};
pub use redemption::{RedeemResult, RedemptionService};
pub use spin::{SpinEligibility, SpinEngine, SpinResult};

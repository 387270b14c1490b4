// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Loyalty-Engine: point ledger and reward distribution for the ordering platform
//!
//! This crate provides the backend API for the loyalty program: crediting
//! points for paid orders, the daily spin draw, redemptions, tier
//! computation, and the payout-rate monitor.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{AwardService, PayoutMonitor, RedemptionService, RewardCatalog, SpinEngine};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub catalog: RewardCatalog,
    pub award_service: AwardService,
    pub spin_engine: SpinEngine,
    pub redemption_service: RedemptionService,
    pub payout_monitor: PayoutMonitor,
}

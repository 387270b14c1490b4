// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Payout monitor: the program's effective giveback rate over a window.
//!
//! Observability only — nothing here enforces the ceiling; it reports
//! the rate so operators can retune the earn rate or the spin table.

use crate::db::FirestoreDb;
use crate::error::Result;
use crate::models::EntryDetail;
use crate::services::TtlCache;
use crate::time_utils::format_utc_rfc3339;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration as StdDuration;

/// Monetary value of one point, in cents, for the giveback computation.
const POINT_VALUE_CENTS: f64 = 1.0;

/// How long a computed report stays fresh.
const REPORT_CACHE_TTL: StdDuration = StdDuration::from_secs(60);

/// Aggregated giveback report for a trailing window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PayoutReport {
    pub window_days: u32,
    pub points_awarded: i64,
    pub points_redeemed: i64,
    pub points_expired: i64,
    /// Sum of order subtotals that earned points in the window
    pub revenue_cents: u64,
    /// awarded point value / revenue; 0 when there was no revenue
    pub giveback_rate: f64,
    pub ceiling: f64,
    pub exceeded: bool,
    pub generated_at: String,
}

/// Read-side aggregation over the ledger, cached per window.
pub struct PayoutMonitor {
    db: FirestoreDb,
    ceiling: f64,
    cache: Arc<TtlCache<u32, PayoutReport>>,
}

impl PayoutMonitor {
    pub fn new(db: FirestoreDb, ceiling: f64) -> Self {
        Self {
            db,
            ceiling,
            cache: Arc::new(TtlCache::new(REPORT_CACHE_TTL)),
        }
    }

    /// Compute (or return the cached) giveback report for the window.
    pub async fn report(&self, window_days: u32) -> Result<PayoutReport> {
        if let Some(cached) = self.cache.get(&window_days) {
            return Ok(cached);
        }

        let now = Utc::now();
        let since = now - Duration::days(window_days as i64);
        let entries = self.db.get_entries_since(since).await?;

        let mut points_awarded: i64 = 0;
        let mut points_redeemed: i64 = 0;
        let mut points_expired: i64 = 0;
        let mut revenue_cents: u64 = 0;

        for entry in &entries {
            match &entry.detail {
                EntryDetail::OrderEarn { subtotal_cents, .. } => {
                    points_awarded += entry.delta;
                    revenue_cents += subtotal_cents;
                }
                EntryDetail::SpinAward { .. } => {
                    points_awarded += entry.delta;
                }
                EntryDetail::Redemption { .. } => {
                    points_redeemed += -entry.delta;
                }
                EntryDetail::Expiration { .. } => {
                    points_expired += -entry.delta;
                }
                EntryDetail::AdminAdjustment { .. } => {
                    // Corrections are excluded from program economics
                }
            }
        }

        let giveback_rate = if revenue_cents > 0 {
            (points_awarded as f64 * POINT_VALUE_CENTS) / revenue_cents as f64
        } else {
            0.0
        };
        let exceeded = giveback_rate > self.ceiling;

        if exceeded {
            tracing::warn!(
                window_days,
                giveback_rate,
                ceiling = self.ceiling,
                "Giveback rate exceeds program ceiling"
            );
        }

        let report = PayoutReport {
            window_days,
            points_awarded,
            points_redeemed,
            points_expired,
            revenue_cents,
            giveback_rate,
            ceiling: self.ceiling,
            exceeded,
            generated_at: format_utc_rfc3339(now),
        };

        self.cache.insert(window_days, report.clone());
        Ok(report)
    }
}

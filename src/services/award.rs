// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Order award service.
//!
//! Called by the order subsystem after a payment is confirmed. Handles
//! the core workflow:
//! 1. Validate the merchandise subtotal
//! 2. Compute the point award (rate, floor, minimum of one)
//! 3. Append the `order_earn` entry and update the projection atomically
//!    under the idempotency guard, keyed by the order ID

use crate::db::{firestore::AppendOutcome, FirestoreDb};
use crate::error::{AppError, Result};
use crate::models::{EntryDetail, LedgerEntry};
use crate::services::tier::Tier;
use crate::time_utils::format_utc_rfc3339;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Result of awarding points for an order.
///
/// Serialized into the idempotency record, so a retried request returns
/// exactly this value again.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AwardResult {
    pub points_awarded: i64,
    pub new_balance: i64,
    pub tier: Tier,
    pub tier_changed: bool,
}

/// Awards points for completed orders.
#[derive(Clone)]
pub struct AwardService {
    db: FirestoreDb,
    earn_rate: f64,
    points_ttl_days: i64,
}

impl AwardService {
    pub fn new(db: FirestoreDb, earn_rate: f64, points_ttl_days: i64) -> Self {
        Self {
            db,
            earn_rate,
            points_ttl_days,
        }
    }

    /// Award points for a paid order, exactly once per order.
    ///
    /// The idempotency key defaults to the order ID; duplicate calls for
    /// the same key return the original award without a second entry.
    pub async fn award_for_order(
        &self,
        user_id: &str,
        order_id: &str,
        subtotal_cents: u64,
        idempotency_key: Option<&str>,
    ) -> Result<AwardResult> {
        if subtotal_cents == 0 {
            return Err(AppError::Validation(
                "Order subtotal must be positive".to_string(),
            ));
        }
        if order_id.is_empty() {
            return Err(AppError::Validation("Order ID must not be empty".to_string()));
        }

        let points = points_for_subtotal(subtotal_cents, self.earn_rate);
        let key = idempotency_key.filter(|k| !k.is_empty()).unwrap_or(order_id);

        let now = Utc::now();
        let entry = LedgerEntry::new(
            user_id,
            points,
            key,
            EntryDetail::OrderEarn {
                order_id: order_id.to_string(),
                subtotal_cents,
            },
            now,
            Some(now + Duration::days(self.points_ttl_days)),
        );

        let now_str = format_utc_rfc3339(now);
        let outcome = self
            .db
            .append_entry_atomic(&entry, None, |balance, _entry| {
                let tier_changed = balance.apply_order_earn(points, subtotal_cents, &now_str);
                let result = AwardResult {
                    points_awarded: points,
                    new_balance: balance.points,
                    tier: balance.tier,
                    tier_changed,
                };
                serde_json::to_value(&result)
                    .map_err(|e| AppError::Internal(anyhow::anyhow!("serialize award: {}", e)))
            })
            .await?;

        let (result, replayed) = match outcome {
            AppendOutcome::Fresh(value) => (value, false),
            AppendOutcome::Replayed(value) => (value, true),
        };

        let result: AwardResult = serde_json::from_value(result)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("deserialize award: {}", e)))?;

        if replayed {
            tracing::debug!(user_id, order_id, "Order already awarded (idempotent replay)");
        } else {
            tracing::info!(
                user_id,
                order_id,
                points = result.points_awarded,
                new_balance = result.new_balance,
                tier = result.tier.as_str(),
                tier_changed = result.tier_changed,
                "Order points awarded"
            );
        }

        Ok(result)
    }
}

/// Points owed for a merchandise subtotal: `floor(subtotal * rate)` with
/// a minimum of one point per qualifying order. Tax, tip, and delivery
/// fee are excluded upstream — only the subtotal reaches this function.
pub fn points_for_subtotal(subtotal_cents: u64, earn_rate: f64) -> i64 {
    let raw = (subtotal_cents as f64 * earn_rate / 100.0).floor() as i64;
    raw.max(1)
}

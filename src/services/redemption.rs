// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Redemption service: balance-consuming requests against the catalog.
//!
//! Validation order matters here:
//! 1. Idempotency replay — a repeated request returns the original result
//!    without re-validating or re-deducting
//! 2. Catalog lookup (unknown / inactive / eligibility rules)
//! 3. Balance sufficiency pre-check for a friendly early rejection
//! 4. Commit under one transaction that re-reads the balance and the
//!    catalog cost and re-verifies sufficiency — the one place a negative
//!    balance must be structurally impossible

use crate::db::{firestore::AppendOutcome, FirestoreDb};
use crate::error::{AppError, Result};
use crate::models::{EntryDetail, EntryKind, LedgerEntry};
use crate::services::RewardCatalog;
use crate::time_utils::format_utc_rfc3339;
use chrono::Utc;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Result of a redemption; replayed verbatim for duplicate requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RedeemResult {
    pub redemption_id: String,
    pub points_used: i64,
    pub remaining_balance: i64,
}

/// Validates and commits balance-consuming redemptions.
#[derive(Clone)]
pub struct RedemptionService {
    db: FirestoreDb,
    catalog: RewardCatalog,
}

impl RedemptionService {
    pub fn new(db: FirestoreDb, catalog: RewardCatalog) -> Self {
        Self { db, catalog }
    }

    /// Redeem a reward, deducting its point cost exactly once per key.
    pub async fn redeem(
        &self,
        user_id: &str,
        reward_id: &str,
        idempotency_key: &str,
        order_subtotal_cents: Option<u64>,
    ) -> Result<RedeemResult> {
        if idempotency_key.is_empty() {
            return Err(AppError::Validation(
                "Idempotency key must not be empty".to_string(),
            ));
        }

        // 1. Replay check before any validation: the catalog may have
        //    changed since the original request, but the stored result
        //    stands.
        let doc_id = LedgerEntry::doc_id(user_id, EntryKind::Redemption, idempotency_key);
        if let Some(record) = self.db.get_idempotency_record(&doc_id).await? {
            tracing::debug!(
                user_id,
                reward_id,
                key = idempotency_key,
                "Redemption replayed from idempotency record"
            );
            return serde_json::from_str(&record.result_json)
                .map_err(|e| AppError::Database(format!("Corrupt idempotency record: {}", e)));
        }

        // 2. Catalog validation
        let reward = self
            .catalog
            .get(reward_id)
            .ok_or_else(|| AppError::Validation(format!("Unknown reward: {}", reward_id)))?;
        if !reward.active {
            return Err(AppError::Validation(format!(
                "Reward '{}' is not currently available",
                reward_id
            )));
        }
        let cost = reward.points_cost;

        // 3. Pre-check balance and eligibility so most failures reject
        //    before the transaction. The commit below re-checks both.
        let balance = self.db.get_balance(user_id).await?;
        let (points, tier) = balance
            .as_ref()
            .map(|b| (b.points, b.tier))
            .unwrap_or((0, crate::services::tier::Tier::Bronze));

        reward
            .check_eligibility(tier, order_subtotal_cents)
            .map_err(AppError::Validation)?;

        if points < cost {
            return Err(AppError::InsufficientBalance {
                balance: points,
                required: cost,
            });
        }

        // 4. Commit: the transaction re-reads the projection; the apply
        //    closure re-verifies sufficiency against that fresh balance,
        //    so a racing redemption aborts instead of going negative.
        let now = Utc::now();
        let entry = LedgerEntry::new(
            user_id,
            -cost,
            idempotency_key,
            EntryDetail::Redemption {
                reward_id: reward.id.clone(),
                reward_name: reward.name.clone(),
            },
            now,
            None,
        );

        let now_str = format_utc_rfc3339(now);
        let entry_id = entry.id.clone();
        let outcome = self
            .db
            .append_entry_atomic(&entry, None, |balance, _entry| {
                balance
                    .apply_redemption(cost, &now_str)
                    .map_err(|current| AppError::InsufficientBalance {
                        balance: current,
                        required: cost,
                    })?;
                let result = RedeemResult {
                    redemption_id: entry_id.clone(),
                    points_used: cost,
                    remaining_balance: balance.points,
                };
                serde_json::to_value(&result)
                    .map_err(|e| AppError::Internal(anyhow::anyhow!("serialize redeem: {}", e)))
            })
            .await?;

        let result = match outcome {
            AppendOutcome::Fresh(value) => value,
            AppendOutcome::Replayed(value) => value,
        };
        let result: RedeemResult = serde_json::from_value(result)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("deserialize redeem: {}", e)))?;

        tracing::info!(
            user_id,
            reward_id,
            points_used = result.points_used,
            remaining = result.remaining_balance,
            "Reward redeemed"
        );

        Ok(result)
    }
}

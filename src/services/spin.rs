// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily spin engine: weighted-random reward draw, one per user per UTC day.

use crate::db::{firestore::AppendOutcome, FirestoreDb};
use crate::error::{AppError, Result};
use crate::models::{EntryDetail, LedgerEntry, OutcomeTable, SpinRecord};
use crate::time_utils::{day_key, format_utc_rfc3339, next_utc_day_start};
use chrono::{DateTime, Duration, Utc};
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Result of a successful spin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SpinResult {
    pub outcome_label: String,
    pub points_awarded: i64,
    pub is_jackpot: bool,
    pub new_balance: i64,
}

/// Whether a user may spin right now.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SpinEligibility {
    pub can_spin: bool,
    /// Start of the next UTC day (RFC3339); the same boundary the gate uses
    pub next_reset: String,
}

/// Weighted spin draw gated to one per user per UTC day.
///
/// The RNG is injected and seedable so the statistical tests run
/// deterministically against the configured table.
pub struct SpinEngine {
    db: FirestoreDb,
    table: OutcomeTable,
    points_ttl_days: i64,
    rng: Mutex<rand::rngs::StdRng>,
}

impl SpinEngine {
    pub fn new(db: FirestoreDb, table: OutcomeTable, points_ttl_days: i64) -> Self {
        Self {
            db,
            table,
            points_ttl_days,
            rng: Mutex::new(rand::rngs::StdRng::from_entropy()),
        }
    }

    /// Deterministic engine for tests.
    pub fn with_seed(db: FirestoreDb, table: OutcomeTable, points_ttl_days: i64, seed: u64) -> Self {
        Self {
            db,
            table,
            points_ttl_days,
            rng: Mutex::new(rand::rngs::StdRng::seed_from_u64(seed)),
        }
    }

    /// Check spin eligibility without consuming anything.
    pub async fn eligibility(&self, user_id: &str, now: DateTime<Utc>) -> Result<SpinEligibility> {
        let day = day_key(now);
        let already_spun = self.db.get_spin_record(user_id, &day).await?.is_some();

        Ok(SpinEligibility {
            can_spin: !already_spun,
            next_reset: format_utc_rfc3339(next_utc_day_start(now)),
        })
    }

    /// Run the daily spin for a user.
    ///
    /// The cooldown check runs before any randomness is consumed; a second
    /// spin in the same UTC day is rejected with the next reset boundary
    /// and leaves no trace in the ledger.
    pub async fn spin(&self, user_id: &str, now: DateTime<Utc>) -> Result<SpinResult> {
        let day = day_key(now);

        if self.db.get_spin_record(user_id, &day).await?.is_some() {
            return Err(AppError::Cooldown {
                next_reset: format_utc_rfc3339(next_utc_day_start(now)),
            });
        }

        let draw: f64 = {
            let mut rng = self.rng.lock().expect("spin rng lock poisoned");
            rng.gen::<f64>()
        };
        let outcome = self.table.resolve(draw).clone();

        tracing::debug!(
            user_id,
            day = %day,
            outcome = %outcome.label,
            points = outcome.points,
            "Spin outcome drawn"
        );

        // The source key namespaces one spin per (user, day); a concurrent
        // duplicate that slips past the record check above collides on the
        // same idempotency document and replays instead of double-crediting.
        let source_key = format!("spin:{}:{}", user_id, day);
        let entry = LedgerEntry::new(
            user_id,
            outcome.points,
            &source_key,
            EntryDetail::SpinAward {
                outcome: outcome.label.clone(),
                jackpot: outcome.jackpot,
            },
            now,
            Some(now + Duration::days(self.points_ttl_days)),
        );

        let record = SpinRecord {
            user_id: user_id.to_string(),
            day_key: day.clone(),
            outcome: outcome.label.clone(),
            points: outcome.points,
            jackpot: outcome.jackpot,
            created_at: now,
        };

        let now_str = format_utc_rfc3339(now);
        let result = self
            .db
            .append_entry_atomic(&entry, Some(&record), |balance, _entry| {
                balance.apply_spin_award(outcome.points, &now_str);
                let result = SpinResult {
                    outcome_label: outcome.label.clone(),
                    points_awarded: outcome.points,
                    is_jackpot: outcome.jackpot,
                    new_balance: balance.points,
                };
                serde_json::to_value(&result)
                    .map_err(|e| AppError::Internal(anyhow::anyhow!("serialize spin: {}", e)))
            })
            .await?;

        let result = match result {
            AppendOutcome::Fresh(value) => value,
            AppendOutcome::Replayed(value) => value,
        };

        let result: SpinResult = serde_json::from_value(result)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("deserialize spin: {}", e)))?;

        tracing::info!(
            user_id,
            day = %day,
            outcome = %result.outcome_label,
            points = result.points_awarded,
            jackpot = result.is_jackpot,
            "Spin recorded"
        );

        Ok(result)
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::db::firestore::HistoryCursor;
use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::reward::RewardSummary;
use crate::models::{EntryDetail, EntryKind, LedgerEntry};
use crate::services::tier::{tier_for, Tier};
use crate::services::{RedeemResult, SpinEligibility, SpinResult};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/loyalty/balance", get(get_balance))
        .route("/api/loyalty/history", get(get_history))
        .route("/api/loyalty/rewards", get(get_rewards))
        .route("/api/loyalty/spin", post(post_spin))
        .route("/api/loyalty/spin/eligibility", get(get_spin_eligibility))
        .route("/api/loyalty/redeem", post(post_redeem))
}

// ─── Balance ─────────────────────────────────────────────────

/// Current balance response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct BalanceResponse {
    pub points: i64,
    pub lifetime_points: u64,
    pub tier: Tier,
    pub next_tier: Option<Tier>,
    pub points_to_next_tier: Option<u64>,
}

/// Get current balance and tier progress.
async fn get_balance(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<BalanceResponse>> {
    // A user with no ledger activity yet has an empty projection
    let balance = state.db.get_balance(&user.user_id).await?;
    let (points, lifetime_points) = balance
        .map(|b| (b.points, b.lifetime_points))
        .unwrap_or((0, 0));

    let progress = tier_for(lifetime_points);

    Ok(Json(BalanceResponse {
        points,
        lifetime_points,
        tier: progress.tier,
        next_tier: progress.next_tier,
        points_to_next_tier: progress.points_to_next_tier,
    }))
}

// ─── History ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct HistoryQuery {
    /// Cursor for forward pagination (opaque token).
    cursor: Option<String>,
    /// Items per page
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_limit() -> u32 {
    50
}

const MAX_LIMIT: u32 = 100;
const CURSOR_PARTS: usize = 2;

fn parse_cursor(cursor: Option<&str>) -> Result<Option<HistoryCursor>> {
    cursor
        .map(|raw| {
            let invalid_cursor =
                || crate::error::AppError::Validation("Invalid 'cursor' parameter".to_string());

            let decoded = URL_SAFE_NO_PAD.decode(raw).map_err(|_| invalid_cursor())?;
            let decoded_str = std::str::from_utf8(&decoded).map_err(|_| invalid_cursor())?;

            let parts: Vec<&str> = decoded_str.split(':').collect();
            if parts.len() != CURSOR_PARTS {
                return Err(invalid_cursor());
            }

            let seconds = parts[0].parse::<i64>().map_err(|_| invalid_cursor())?;
            let nanos = parts[1].parse::<u32>().map_err(|_| invalid_cursor())?;
            let created_at =
                chrono::DateTime::from_timestamp(seconds, nanos).ok_or_else(invalid_cursor)?;

            Ok(HistoryCursor { created_at })
        })
        .transpose()
}

fn encode_cursor(cursor: HistoryCursor) -> String {
    let payload = format!(
        "{}:{}",
        cursor.created_at.timestamp(),
        cursor.created_at.timestamp_subsec_nanos()
    );
    URL_SAFE_NO_PAD.encode(payload)
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HistoryResponse {
    pub entries: Vec<HistoryEntry>,
    pub next_cursor: Option<String>,
}

#[derive(Serialize, Clone, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HistoryEntry {
    pub id: String,
    pub kind: EntryKind,
    pub delta: i64,
    pub created_at: String,
    /// Human-readable summary of the movement
    pub description: String,
}

/// Describe a ledger entry for display.
fn describe(entry: &LedgerEntry) -> String {
    match &entry.detail {
        EntryDetail::OrderEarn { order_id, .. } => format!("Points for order {}", order_id),
        EntryDetail::SpinAward { outcome, jackpot } => {
            if *jackpot {
                format!("Daily spin jackpot: {}", outcome)
            } else {
                format!("Daily spin: {}", outcome)
            }
        }
        EntryDetail::Redemption { reward_name, .. } => format!("Redeemed {}", reward_name),
        EntryDetail::AdminAdjustment { reason, .. } => format!("Adjustment: {}", reason),
        EntryDetail::Expiration { .. } => "Points expired".to_string(),
    }
}

/// Get the user's ledger history, most recent first.
async fn get_history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>> {
    let limit = params.limit.min(MAX_LIMIT).max(1);
    let cursor = parse_cursor(params.cursor.as_deref())?;

    tracing::debug!(
        user_id = %user.user_id,
        cursor = ?params.cursor,
        limit,
        "Fetching ledger history"
    );

    // Fetch one extra item to determine if another page is available.
    let fetch_limit = limit.saturating_add(1);
    let mut results = state
        .db
        .get_history(&user.user_id, cursor, fetch_limit)
        .await?;

    let has_more = results.len() > limit as usize;
    if has_more {
        results.truncate(limit as usize);
    }

    let next_cursor = if has_more {
        results.last().map(|e| {
            encode_cursor(HistoryCursor {
                created_at: e.created_at,
            })
        })
    } else {
        None
    };

    let entries: Vec<HistoryEntry> = results
        .iter()
        .map(|e| HistoryEntry {
            id: e.id.clone(),
            kind: e.kind,
            delta: e.delta,
            created_at: format_utc_rfc3339(e.created_at),
            description: describe(e),
        })
        .collect();

    Ok(Json(HistoryResponse {
        entries,
        next_cursor,
    }))
}

// ─── Rewards ─────────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RewardsResponse {
    pub rewards: Vec<RewardSummary>,
}

/// List rewards currently available for redemption.
async fn get_rewards(State(state): State<Arc<AppState>>) -> Result<Json<RewardsResponse>> {
    let rewards = state
        .catalog
        .active_rewards()
        .map(RewardSummary::from)
        .collect();
    Ok(Json(RewardsResponse { rewards }))
}

// ─── Spin ────────────────────────────────────────────────────

/// Run the daily spin.
async fn post_spin(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<SpinResult>> {
    let result = state
        .spin_engine
        .spin(&user.user_id, chrono::Utc::now())
        .await?;
    Ok(Json(result))
}

/// Check whether the user can spin today.
async fn get_spin_eligibility(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<SpinEligibility>> {
    let eligibility = state
        .spin_engine
        .eligibility(&user.user_id, chrono::Utc::now())
        .await?;
    Ok(Json(eligibility))
}

// ─── Redeem ──────────────────────────────────────────────────

#[derive(Deserialize)]
struct RedeemRequest {
    reward_id: String,
    idempotency_key: String,
    /// Subtotal of the order this redemption attaches to, when the
    /// reward's eligibility rules need it
    order_subtotal_cents: Option<u64>,
}

/// Redeem a reward against the current balance.
async fn post_redeem(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<RedeemRequest>,
) -> Result<Json<RedeemResult>> {
    let result = state
        .redemption_service
        .redeem(
            &user.user_id,
            &req.reward_id,
            &req.idempotency_key,
            req.order_subtotal_cents,
        )
        .await?;
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_round_trip() {
        let cursor = HistoryCursor {
            created_at: chrono::DateTime::from_timestamp(1_704_103_200, 123).unwrap(),
        };

        let encoded = encode_cursor(cursor);
        let decoded = parse_cursor(Some(&encoded)).unwrap().unwrap();

        assert_eq!(decoded.created_at, cursor.created_at);
    }

    #[test]
    fn test_cursor_rejects_invalid_input() {
        let err = parse_cursor(Some("not-base64")).unwrap_err();
        assert!(matches!(err, crate::error::AppError::Validation(_)));
    }

    #[test]
    fn test_describe_is_exhaustive_over_entry_kinds() {
        let now = chrono::Utc::now();
        let entry = LedgerEntry::new(
            "u",
            -60,
            "key",
            EntryDetail::Redemption {
                reward_id: "free-dessert".to_string(),
                reward_name: "Free Dessert".to_string(),
            },
            now,
            None,
        );
        assert_eq!(describe(&entry), "Redeemed Free Dessert");
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Internal service-to-service routes.
//!
//! Called by the order subsystem after payment capture, by the scheduler
//! for the expiration sweep, and by the admin console for adjustments and
//! the payout report. Authenticated by the shared service token in
//! middleware/service_auth.rs.

use crate::error::{AppError, Result};
use crate::models::{EntryDetail, LedgerEntry};
use crate::services::{run_sweep, AwardResult, PayoutReport, SweepSummary};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Internal routes (service token required).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/internal/loyalty/award-order", post(post_award_order))
        .route("/internal/loyalty/adjust", post(post_adjust))
        .route("/internal/loyalty/expire-sweep", post(post_expire_sweep))
        .route("/internal/loyalty/payout", get(get_payout))
}

// ─── Order Award ─────────────────────────────────────────────

#[derive(Deserialize, Validate)]
struct AwardOrderRequest {
    #[validate(length(min = 1, max = 128))]
    user_id: String,
    #[validate(length(min = 1, max = 128))]
    order_id: String,
    /// Merchandise subtotal only; tax, tip, and delivery fee are excluded
    /// by the order subsystem before it calls us
    subtotal_cents: u64,
    /// Defaults to the order ID
    #[validate(length(max = 128))]
    idempotency_key: Option<String>,
}

/// Award points for a paid order (idempotent per order).
async fn post_award_order(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AwardOrderRequest>,
) -> Result<Json<AwardResult>> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let result = state
        .award_service
        .award_for_order(
            &req.user_id,
            &req.order_id,
            req.subtotal_cents,
            req.idempotency_key.as_deref(),
        )
        .await?;

    Ok(Json(result))
}

// ─── Admin Adjustment ────────────────────────────────────────

#[derive(Deserialize, Validate)]
struct AdjustRequest {
    #[validate(length(min = 1, max = 128))]
    user_id: String,
    /// Signed point delta; negative adjustments are clamped at zero balance
    delta: i64,
    #[validate(length(min = 1, max = 512))]
    reason: String,
    #[validate(length(min = 1, max = 128))]
    idempotency_key: String,
}

#[derive(Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AdjustResponse {
    /// Delta actually applied after clamping
    pub applied_delta: i64,
    pub new_balance: i64,
}

/// Apply an admin point adjustment (idempotent per key).
async fn post_adjust(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AdjustRequest>,
) -> Result<Json<AdjustResponse>> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    if req.delta == 0 {
        return Err(AppError::Validation(
            "Adjustment delta must be non-zero".to_string(),
        ));
    }

    let now = chrono::Utc::now();
    let entry = LedgerEntry::new(
        &req.user_id,
        req.delta,
        &req.idempotency_key,
        EntryDetail::AdminAdjustment {
            reason: req.reason.clone(),
            requested: req.delta,
        },
        now,
        None,
    );

    let now_str = format_utc_rfc3339(now);
    let delta = req.delta;
    let outcome = state
        .db
        .append_entry_atomic(&entry, None, |balance, entry| {
            let applied = balance.apply_adjustment(delta, &now_str);
            // The stored delta is what actually moved, so the ledger still
            // sums to the projection after clamping
            entry.delta = applied;
            let response = AdjustResponse {
                applied_delta: applied,
                new_balance: balance.points,
            };
            serde_json::to_value(&response)
                .map_err(|e| AppError::Internal(anyhow::anyhow!("serialize adjust: {}", e)))
        })
        .await?;

    let value = match outcome {
        crate::db::firestore::AppendOutcome::Fresh(v) => v,
        crate::db::firestore::AppendOutcome::Replayed(v) => v,
    };
    let response: AdjustResponse = serde_json::from_value(value)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("deserialize adjust: {}", e)))?;

    tracing::info!(
        user_id = %req.user_id,
        requested = req.delta,
        applied = response.applied_delta,
        reason = %req.reason,
        "Admin adjustment applied"
    );

    Ok(Json(response))
}

// ─── Expiration Sweep ────────────────────────────────────────

/// Run one expiration sweep (triggered by the scheduler).
async fn post_expire_sweep(State(state): State<Arc<AppState>>) -> Result<Json<SweepSummary>> {
    let summary = run_sweep(&state.db, chrono::Utc::now()).await?;
    Ok(Json(summary))
}

// ─── Payout Report ───────────────────────────────────────────

#[derive(Deserialize)]
struct PayoutQuery {
    #[serde(default = "default_window_days")]
    window_days: u32,
}

fn default_window_days() -> u32 {
    30
}

const MAX_WINDOW_DAYS: u32 = 365;

/// Giveback-rate report over a trailing window.
async fn get_payout(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PayoutQuery>,
) -> Result<Json<PayoutReport>> {
    if params.window_days == 0 || params.window_days > MAX_WINDOW_DAYS {
        return Err(AppError::Validation(format!(
            "window_days must be between 1 and {}",
            MAX_WINDOW_DAYS
        )));
    }

    let report = state.payout_monitor.report(params.window_days).await?;
    Ok(Json(report))
}

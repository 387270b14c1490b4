// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Expiration sweep: lapse earn entries past their retention window.
//!
//! Externally triggered (Cloud Scheduler in production), not request
//! driven. Each source entry is swept in its own atomic unit, so a sweep
//! restart never double-expires — the per-entry transaction re-reads the
//! source and skips it once marked.

use crate::db::FirestoreDb;
use crate::error::Result;
use crate::models::{EntryDetail, LedgerEntry};
use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Concurrent per-entry transactions; kept low to limit contention with
/// live traffic on the same balance documents.
const MAX_CONCURRENT_SWEEPS: usize = 10;

/// Entries examined per sweep invocation.
const SWEEP_BATCH_LIMIT: u32 = 500;

/// Summary of one sweep run.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SweepSummary {
    pub scanned: u32,
    pub swept: u32,
    pub points_removed: i64,
}

/// Run one expiration sweep over entries due at `now`.
///
/// Only `points` drop; `lifetime_points` — and therefore tier progress —
/// is permanent even after points lapse.
pub async fn run_sweep(db: &FirestoreDb, now: DateTime<Utc>) -> Result<SweepSummary> {
    let due = db.find_expired_entries(now, SWEEP_BATCH_LIMIT).await?;
    let scanned = due.len() as u32;

    tracing::info!(scanned, "Expiration sweep starting");

    let results: Vec<Result<Option<i64>>> = stream::iter(due)
        .map(|source| async move {
            let offset = offset_entry(&source, now);
            db.expire_entry_atomic(&source, &offset, now).await
        })
        .buffer_unordered(MAX_CONCURRENT_SWEEPS)
        .collect()
        .await;

    let mut swept = 0;
    let mut points_removed = 0;
    for result in results {
        if let Some(removed) = result? {
            swept += 1;
            points_removed += removed;
        }
    }

    tracing::info!(scanned, swept, points_removed, "Expiration sweep complete");

    Ok(SweepSummary {
        scanned,
        swept,
        points_removed,
    })
}

/// Build the offsetting `expiration` entry for a lapsed source entry.
///
/// The delta here is provisional; the transaction clamps it to what the
/// balance can still cover.
fn offset_entry(source: &LedgerEntry, now: DateTime<Utc>) -> LedgerEntry {
    LedgerEntry::new(
        &source.user_id,
        -source.delta,
        &format!("expire:{}", source.id),
        EntryDetail::Expiration {
            source_entry_id: source.id.clone(),
            original_amount: source.delta,
        },
        now,
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntryKind;

    #[test]
    fn test_offset_entry_references_source() {
        let now = Utc::now();
        let source = LedgerEntry::new(
            "user1",
            20,
            "order-9",
            EntryDetail::OrderEarn {
                order_id: "order-9".to_string(),
                subtotal_cents: 20_000,
            },
            now - chrono::Duration::days(31),
            Some(now - chrono::Duration::days(1)),
        );

        let offset = offset_entry(&source, now);

        assert_eq!(offset.kind, EntryKind::Expiration);
        assert_eq!(offset.delta, -20);
        assert_eq!(offset.user_id, "user1");
        assert!(offset.expires_at.is_none());
        match &offset.detail {
            EntryDetail::Expiration {
                source_entry_id,
                original_amount,
            } => {
                assert_eq!(source_entry_id, &source.id);
                assert_eq!(*original_amount, 20);
            }
            other => panic!("unexpected detail: {:?}", other),
        }
    }
}

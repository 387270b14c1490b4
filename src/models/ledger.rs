// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Point-movement ledger entry model.
//!
//! Entries are immutable once written (the expiration sweep only flips the
//! `expired` marker). The Firestore document ID is derived from
//! `(kind, user_id, source_key)`, so the store's document-ID uniqueness is
//! the structural dedupe constraint for retried requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Discriminant for ledger entry kinds.
///
/// Stored as a flat field alongside `detail` so Firestore queries can
/// filter on it without deserializing the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    OrderEarn,
    SpinAward,
    Redemption,
    AdminAdjustment,
    Expiration,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::OrderEarn => "order_earn",
            EntryKind::SpinAward => "spin_award",
            EntryKind::Redemption => "redemption",
            EntryKind::AdminAdjustment => "admin_adjustment",
            EntryKind::Expiration => "expiration",
        }
    }
}

/// Per-kind entry payload, tagged by the same discriminant as [`EntryKind`].
///
/// A closed union instead of free-form JSON: processing history is an
/// exhaustive match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryDetail {
    OrderEarn {
        order_id: String,
        subtotal_cents: u64,
    },
    SpinAward {
        outcome: String,
        jackpot: bool,
    },
    Redemption {
        reward_id: String,
        reward_name: String,
    },
    AdminAdjustment {
        reason: String,
        /// Delta as requested; the entry's `delta` holds what was actually
        /// applied after clamping against the balance
        requested: i64,
    },
    Expiration {
        /// Document ID of the lapsed source entry
        source_entry_id: String,
        /// Amount originally earned; the applied delta may be smaller if
        /// the balance had already been spent down
        original_amount: i64,
    },
}

impl EntryDetail {
    pub fn kind(&self) -> EntryKind {
        match self {
            EntryDetail::OrderEarn { .. } => EntryKind::OrderEarn,
            EntryDetail::SpinAward { .. } => EntryKind::SpinAward,
            EntryDetail::Redemption { .. } => EntryKind::Redemption,
            EntryDetail::AdminAdjustment { .. } => EntryKind::AdminAdjustment,
            EntryDetail::Expiration { .. } => EntryKind::Expiration,
        }
    }
}

/// Stored ledger entry in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Derived document ID (also stored in the document for history reads)
    pub id: String,
    /// Owning user (identity provider subject)
    pub user_id: String,
    /// Entry kind discriminant (flat copy of `detail`'s tag)
    pub kind: EntryKind,
    /// Signed point movement: positive = credit, negative = debit
    pub delta: i64,
    /// Server-assigned creation timestamp
    pub created_at: DateTime<Utc>,
    /// Caller-supplied idempotency/dedupe key, unique per (user, kind)
    pub source_key: String,
    /// Per-kind payload
    pub detail: EntryDetail,
    /// Set on earn entries; consumed by the expiration sweep
    pub expires_at: Option<DateTime<Utc>>,
    /// Marked by the sweep once an offsetting expiration entry exists
    #[serde(default)]
    pub expired: bool,
}

impl LedgerEntry {
    /// Derive the Firestore document ID for `(kind, user, source_key)`.
    ///
    /// The source key is URL-encoded so arbitrary caller-supplied keys
    /// produce valid document IDs.
    pub fn doc_id(user_id: &str, kind: EntryKind, source_key: &str) -> String {
        format!(
            "{}_{}_{}",
            kind.as_str(),
            user_id,
            urlencoding::encode(source_key)
        )
    }

    pub fn new(
        user_id: &str,
        delta: i64,
        source_key: &str,
        detail: EntryDetail,
        created_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        let kind = detail.kind();
        Self {
            id: Self::doc_id(user_id, kind, source_key),
            user_id: user_id.to_string(),
            kind,
            delta,
            created_at,
            source_key: source_key.to_string(),
            detail,
            expires_at,
            expired: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_id_encodes_source_key() {
        let id = LedgerEntry::doc_id("user1", EntryKind::SpinAward, "spin:user1:2024-03-15");
        assert_eq!(id, "spin_award_user1_spin%3Auser1%3A2024-03-15");
    }

    #[test]
    fn test_doc_id_is_stable_per_kind() {
        let a = LedgerEntry::doc_id("u", EntryKind::OrderEarn, "order-77");
        let b = LedgerEntry::doc_id("u", EntryKind::Redemption, "order-77");
        assert_ne!(a, b, "same source key in different kinds must not collide");
    }

    #[test]
    fn test_detail_kind_matches_flat_field() {
        let entry = LedgerEntry::new(
            "u",
            25,
            "order-1",
            EntryDetail::OrderEarn {
                order_id: "order-1".to_string(),
                subtotal_cents: 25_000,
            },
            chrono::Utc::now(),
            None,
        );
        assert_eq!(entry.kind, entry.detail.kind());
        assert_eq!(entry.kind, EntryKind::OrderEarn);
    }
}

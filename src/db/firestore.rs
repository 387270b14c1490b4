// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Ledger entries (append-only point movements)
//! - Balance projections (per-user derived summary)
//! - Spin records (daily cooldown gate)
//! - Idempotency records (stored results for replay)
//!
//! Every balance mutation goes through a single atomic transaction that
//! appends the ledger entry, updates the projection, and stores the
//! idempotency result together. A retried request therefore either
//! replays the stored result or hits the document-ID uniqueness of the
//! entry itself; there is no window where a duplicate credit can appear.

use crate::config::MAX_TXN_RETRIES;
use crate::db::collections;
use crate::error::AppError;
use crate::models::{BalanceProjection, LedgerEntry, SpinRecord};
use chrono::{DateTime, Utc};
use firestore::FirestoreConsistencySelector;

/// Stored idempotency record: the serialized success result for a key.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IdempotencyRecord {
    pub key: String,
    /// Serialized JSON of the operation's success response
    pub result_json: String,
    pub created_at: DateTime<Utc>,
}

/// Cursor into the per-user history query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryCursor {
    pub created_at: DateTime<Utc>,
}

/// Outcome of an atomic ledger append.
pub enum AppendOutcome {
    /// The entry was written; value is the freshly computed result.
    Fresh(serde_json::Value),
    /// An idempotency record already existed; value is the stored result.
    Replayed(serde_json::Value),
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        // Use ExternalJwtFunctionSource to provide a dummy token without needing async-trait
        // or a custom TokenSource implementation struct.
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── Balance Operations ──────────────────────────────────────

    /// Get a user's balance projection.
    pub async fn get_balance(&self, user_id: &str) -> Result<Option<BalanceProjection>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::BALANCES)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Ledger Reads ────────────────────────────────────────────

    /// Get a single ledger entry by document ID.
    pub async fn get_entry(&self, doc_id: &str) -> Result<Option<LedgerEntry>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::LEDGER)
            .obj()
            .one(doc_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a user's ledger history, most recent first, with cursor paging.
    pub async fn get_history(
        &self,
        user_id: &str,
        cursor: Option<HistoryCursor>,
        limit: u32,
    ) -> Result<Vec<LedgerEntry>, AppError> {
        let query = self.get_client()?.fluent().select().from(collections::LEDGER);

        let user_id = user_id.to_string();
        let query = if let Some(cursor) = cursor {
            query.filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(user_id.clone()),
                    q.field("created_at").less_than(cursor.created_at),
                ])
            })
        } else {
            query.filter(move |q| q.field("user_id").eq(user_id.clone()))
        };

        query
            .order_by([(
                "created_at",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get all ledger entries created since `since` (payout window scan).
    pub async fn get_entries_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<LedgerEntry>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::LEDGER)
            .filter(move |q| q.field("created_at").greater_than_or_equal(since))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find earn entries whose retention window has lapsed and that have
    /// not yet been swept.
    pub async fn find_expired_entries(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<LedgerEntry>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::LEDGER)
            .filter(move |q| {
                q.for_all([
                    q.field("expired").eq(false),
                    q.field("expires_at").less_than_or_equal(now),
                ])
            })
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Spin Records ────────────────────────────────────────────

    /// Get the spin record for `(user, day)` if one exists.
    pub async fn get_spin_record(
        &self,
        user_id: &str,
        day_key: &str,
    ) -> Result<Option<SpinRecord>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::SPIN_RECORDS)
            .obj()
            .one(&SpinRecord::doc_id(user_id, day_key))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Idempotency ─────────────────────────────────────────────

    /// Look up a stored idempotency result outside a transaction.
    ///
    /// Used as the fast-path replay check; the authoritative check runs
    /// again inside the committing transaction.
    pub async fn get_idempotency_record(
        &self,
        key: &str,
    ) -> Result<Option<IdempotencyRecord>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::IDEMPOTENCY)
            .obj()
            .one(key)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Atomic Ledger Append ────────────────────────────────────

    /// Atomically append a ledger entry: replay check, projection update,
    /// entry write, idempotency write, optional spin record — all in one
    /// Firestore transaction.
    ///
    /// `apply` mutates the projection and returns the JSON result to store
    /// under the idempotency key; validation failures inside `apply`
    /// (e.g. the commit-time sufficiency re-check) abort without writing.
    /// `apply` may also rewrite the entry's delta when the applied amount
    /// differs from the requested one (clamped adjustments).
    ///
    /// Commit failures are treated as contention and retried a bounded
    /// number of times with fresh reads; exhausting the retries surfaces
    /// as [`AppError::ConcurrencyConflict`], which is safe to retry
    /// end-to-end because of the idempotency key.
    pub async fn append_entry_atomic<F>(
        &self,
        entry: &LedgerEntry,
        spin_record: Option<&SpinRecord>,
        apply: F,
    ) -> Result<AppendOutcome, AppError>
    where
        F: Fn(&mut BalanceProjection, &mut LedgerEntry) -> Result<serde_json::Value, AppError>,
    {
        let user_id = entry.user_id.as_str();

        for attempt in 0..MAX_TXN_RETRIES {
            // Begin a transaction
            let mut transaction = self
                .get_client()?
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            // Reads must go through this handle so they join the
            // transaction's read set; a commit with an empty read set
            // gets no conflict detection.
            let txn_db = self.get_client()?.clone_with_consistency_selector(
                FirestoreConsistencySelector::Transaction(transaction.transaction_id().clone()),
            );

            // 1. Replay check - if the result is already stored, return it
            //    verbatim and run no side effects.
            let prior: Option<IdempotencyRecord> = txn_db
                .fluent()
                .select()
                .by_id_in(collections::IDEMPOTENCY)
                .obj()
                .one(&entry.id)
                .await
                .map_err(|e| {
                    AppError::Database(format!("Failed to read idempotency record: {}", e))
                })?;

            if let Some(record) = prior {
                tracing::debug!(
                    user_id,
                    key = %entry.source_key,
                    "Duplicate request replayed from idempotency record"
                );
                let _ = transaction.rollback().await;
                let stored = serde_json::from_str(&record.result_json).map_err(|e| {
                    AppError::Database(format!("Corrupt idempotency record: {}", e))
                })?;
                return Ok(AppendOutcome::Replayed(stored));
            }

            // 2. Read the current projection within the transaction, so a
            //    concurrent writer to the same projection fails this commit
            let current: Option<BalanceProjection> = txn_db
                .fluent()
                .select()
                .by_id_in(collections::BALANCES)
                .obj()
                .one(user_id)
                .await
                .map_err(|e| {
                    AppError::Database(format!("Failed to read balance in transaction: {}", e))
                })?;

            let mut balance =
                current.unwrap_or_else(|| BalanceProjection::new(user_id));

            // 3. Apply the mutation; abort cleanly on validation failure
            let mut entry = entry.clone();
            let result = match apply(&mut balance, &mut entry) {
                Ok(result) => result,
                Err(err) => {
                    let _ = transaction.rollback().await;
                    return Err(err);
                }
            };

            // 4. Add ledger entry write to transaction
            self.get_client()?
                .fluent()
                .update()
                .in_col(collections::LEDGER)
                .document_id(&entry.id)
                .object(&entry)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add entry to transaction: {}", e))
                })?;

            // 5. Add projection write to transaction
            self.get_client()?
                .fluent()
                .update()
                .in_col(collections::BALANCES)
                .document_id(user_id)
                .object(&balance)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add balance to transaction: {}", e))
                })?;

            // 6. Add idempotency record so the next retry replays
            let record = IdempotencyRecord {
                key: entry.id.clone(),
                result_json: result.to_string(),
                created_at: entry.created_at,
            };
            self.get_client()?
                .fluent()
                .update()
                .in_col(collections::IDEMPOTENCY)
                .document_id(&entry.id)
                .object(&record)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!(
                        "Failed to add idempotency record to transaction: {}",
                        e
                    ))
                })?;

            // 7. For spins, the cooldown record commits with the award —
            //    either both are visible or neither is.
            if let Some(record) = spin_record {
                self.get_client()?
                    .fluent()
                    .update()
                    .in_col(collections::SPIN_RECORDS)
                    .document_id(&SpinRecord::doc_id(&record.user_id, &record.day_key))
                    .object(record)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add spin record to transaction: {}",
                            e
                        ))
                    })?;
            }

            // 8. Commit atomically; a failed commit means another writer
            //    got there first, so loop with fresh reads.
            match transaction.commit().await {
                Ok(_) => {
                    tracing::info!(
                        user_id,
                        kind = entry.kind.as_str(),
                        delta = entry.delta,
                        key = %entry.source_key,
                        "Ledger entry committed"
                    );
                    return Ok(AppendOutcome::Fresh(result));
                }
                Err(e) => {
                    tracing::warn!(
                        user_id,
                        key = %entry.source_key,
                        attempt,
                        error = %e,
                        "Transaction commit failed, retrying"
                    );
                }
            }
        }

        Err(AppError::ConcurrencyConflict)
    }

    // ─── Expiration Sweep ────────────────────────────────────────

    /// Atomically expire one lapsed earn entry: append the offsetting
    /// `expiration` entry, decrement the projection (clamped at zero),
    /// and mark the source entry swept.
    ///
    /// Restart-safe: the source entry is re-read inside the transaction
    /// and skipped if another sweep already marked it.
    ///
    /// Returns the points actually removed, or None if already swept.
    pub async fn expire_entry_atomic(
        &self,
        source: &LedgerEntry,
        offset: &LedgerEntry,
        now: DateTime<Utc>,
    ) -> Result<Option<i64>, AppError> {
        for attempt in 0..MAX_TXN_RETRIES {
            let mut transaction = self
                .get_client()?
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            // Transaction-attached reads, same as the append path
            let txn_db = self.get_client()?.clone_with_consistency_selector(
                FirestoreConsistencySelector::Transaction(transaction.transaction_id().clone()),
            );

            // Re-read the source entry; skip if a previous sweep won
            let fresh: Option<LedgerEntry> = txn_db
                .fluent()
                .select()
                .by_id_in(collections::LEDGER)
                .obj()
                .one(&source.id)
                .await
                .map_err(|e| {
                    AppError::Database(format!("Failed to re-read entry in sweep: {}", e))
                })?;

            let mut fresh = match fresh {
                Some(entry) if !entry.expired => entry,
                _ => {
                    tracing::debug!(entry_id = %source.id, "Entry already swept, skipping");
                    let _ = transaction.rollback().await;
                    return Ok(None);
                }
            };

            let current: Option<BalanceProjection> = txn_db
                .fluent()
                .select()
                .by_id_in(collections::BALANCES)
                .obj()
                .one(&source.user_id)
                .await
                .map_err(|e| {
                    AppError::Database(format!("Failed to read balance in sweep: {}", e))
                })?;

            let mut balance =
                current.unwrap_or_else(|| BalanceProjection::new(&source.user_id));
            let removed =
                balance.apply_expiration(source.delta, &crate::time_utils::format_utc_rfc3339(now));

            // The offsetting entry records what was actually removed
            let mut offset = offset.clone();
            offset.delta = -removed;

            fresh.expired = true;

            self.get_client()?
                .fluent()
                .update()
                .in_col(collections::LEDGER)
                .document_id(&offset.id)
                .object(&offset)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add expiration entry: {}", e))
                })?;

            self.get_client()?
                .fluent()
                .update()
                .in_col(collections::LEDGER)
                .document_id(&fresh.id)
                .object(&fresh)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to mark entry expired: {}", e))
                })?;

            self.get_client()?
                .fluent()
                .update()
                .in_col(collections::BALANCES)
                .document_id(&source.user_id)
                .object(&balance)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add balance to sweep: {}", e))
                })?;

            match transaction.commit().await {
                Ok(_) => {
                    tracing::info!(
                        user_id = %source.user_id,
                        entry_id = %source.id,
                        removed,
                        "Lapsed entry swept"
                    );
                    return Ok(Some(removed));
                }
                Err(e) => {
                    tracing::warn!(
                        entry_id = %source.id,
                        attempt,
                        error = %e,
                        "Sweep commit failed, retrying"
                    );
                }
            }
        }

        Err(AppError::ConcurrencyConflict)
    }
}

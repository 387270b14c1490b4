//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    /// Append-only point-movement records
    pub const LEDGER: &str = "ledger_entries";
    /// Per-user balance projections (keyed by user ID)
    pub const BALANCES: &str = "balances";
    /// One record per (user, UTC day) spin
    pub const SPIN_RECORDS: &str = "spin_records";
    /// Stored results for idempotent replay (keyed like the ledger entry)
    pub const IDEMPOTENCY: &str = "idempotency";
}

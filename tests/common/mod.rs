// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use loyalty_engine::config::Config;
use loyalty_engine::db::FirestoreDb;
use loyalty_engine::routes::create_router;
use loyalty_engine::services::{
    AwardService, PayoutMonitor, RedemptionService, RewardCatalog, SpinEngine,
};
use loyalty_engine::AppState;
use std::sync::Arc;

/// Catalog fixture shared by redemption tests. Costs are chosen so the
/// insufficient-balance and concurrency scenarios have clean numbers.
#[allow(dead_code)]
pub const TEST_CATALOG: &str = r#"[
    {"id": "free-drink", "name": "Free Drink", "points_cost": 40},
    {"id": "free-side", "name": "Free Side", "points_cost": 60},
    {"id": "ten-off", "name": "$10 Off", "points_cost": 250,
     "min_subtotal_cents": 3000, "min_tier": "silver"},
    {"id": "retired", "name": "Retired Promo", "points_cost": 10, "active": false}
]"#;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

#[allow(dead_code)]
pub fn test_catalog() -> RewardCatalog {
    RewardCatalog::load_from_json(TEST_CATALOG).expect("test catalog should parse")
}

/// Create a test JWT for a user.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str, signing_key: &[u8]) -> String {
    loyalty_engine::middleware::auth::create_jwt(user_id, signing_key)
        .expect("Failed to create test JWT")
}

/// Build the full set of services around a database handle.
#[allow(dead_code)]
pub fn build_state(config: Config, db: FirestoreDb) -> Arc<AppState> {
    let catalog = test_catalog();
    let award_service = AwardService::new(db.clone(), config.earn_rate, config.points_ttl_days);
    let spin_engine = SpinEngine::new(db.clone(), config.spin_table.clone(), config.points_ttl_days);
    let redemption_service = RedemptionService::new(db.clone(), catalog.clone());
    let payout_monitor = PayoutMonitor::new(db.clone(), config.payout_ceiling);

    Arc::new(AppState {
        config,
        db,
        catalog,
        award_service,
        spin_engine,
        redemption_service,
        payout_monitor,
    })
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let state = build_state(Config::test_default(), test_db_offline());
    (create_router(state.clone()), state)
}

/// Create a test app backed by the Firestore emulator.
#[allow(dead_code)]
pub async fn create_emulator_app() -> (axum::Router, Arc<AppState>) {
    let state = build_state(Config::test_default(), test_db().await);
    (create_router(state.clone()), state)
}

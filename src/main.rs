// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Loyalty-Engine API Server
//!
//! Serves the loyalty program: order point awards, the daily spin,
//! redemptions, history, and the payout monitor, all backed by a
//! Firestore ledger.

use loyalty_engine::{
    config::Config,
    db::FirestoreDb,
    services::{AwardService, PayoutMonitor, RedemptionService, RewardCatalog, SpinEngine},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Loyalty-Engine API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    // Load reward catalog
    tracing::info!(path = %config.catalog_path, "Loading reward catalog");
    let catalog =
        RewardCatalog::load_from_file(&config.catalog_path).expect("Failed to load reward catalog");

    // Initialize services
    let award_service = AwardService::new(db.clone(), config.earn_rate, config.points_ttl_days);
    let spin_engine = SpinEngine::new(db.clone(), config.spin_table.clone(), config.points_ttl_days);
    let redemption_service = RedemptionService::new(db.clone(), catalog.clone());
    let payout_monitor = PayoutMonitor::new(db.clone(), config.payout_ceiling);
    tracing::info!(
        earn_rate = config.earn_rate,
        points_ttl_days = config.points_ttl_days,
        spin_ev = config.spin_table.expected_value(),
        "Loyalty services initialized"
    );

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        catalog,
        award_service,
        spin_engine,
        redemption_service,
        payout_monitor,
    });

    // Build router
    let app = loyalty_engine::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("loyalty_engine=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}

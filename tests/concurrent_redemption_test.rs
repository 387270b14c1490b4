// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use chrono::Utc;
use loyalty_engine::config::Config;
use loyalty_engine::services::{AwardService, RedemptionService};

mod common;

const REWARD_COST: i64 = 60;

#[tokio::test]
async fn test_concurrent_redemptions_cannot_overdraw() {
    // Two redemptions race against a balance that covers only one of them.
    // If the sufficiency check ran outside the transaction, both could read
    // the same balance, both pass, and the projection would go negative.

    if std::env::var("FIRESTORE_EMULATOR_HOST").is_err() {
        println!("Skipping test because FIRESTORE_EMULATOR_HOST is not set");
        return;
    }

    let db = common::test_db().await;
    let config = Config::test_default();
    let user_id = format!(
        "redeem-race-{}",
        Utc::now().timestamp_nanos_opt().unwrap_or_default()
    );

    // Seed a balance of 100 points ($1000.00 order at the default rate)
    AwardService::new(db.clone(), config.earn_rate, config.points_ttl_days)
        .award_for_order(&user_id, "order-seed", 100_000, None)
        .await
        .expect("seed award failed");

    let mut handles = vec![];
    for i in 0..2 {
        let service = RedemptionService::new(db.clone(), common::test_catalog());
        let user_id = user_id.clone();
        handles.push(tokio::spawn(async move {
            // Distinct keys: these are two genuine requests, not a retry
            service
                .redeem(&user_id, "free-side", &format!("checkout-{}", i), None)
                .await
        }));
    }

    let mut successes = 0;
    let mut failures = 0;
    for handle in handles {
        match handle.await.expect("task join failed") {
            Ok(result) => {
                successes += 1;
                assert_eq!(result.points_used, REWARD_COST);
            }
            Err(err) => {
                failures += 1;
                assert!(
                    !matches!(err, loyalty_engine::error::AppError::Database(_)),
                    "loser must fail a balance check, not the database: {:?}",
                    err
                );
            }
        }
    }

    assert_eq!(successes, 1, "exactly one redemption may win");
    assert_eq!(failures, 1);

    let balance = db
        .get_balance(&user_id)
        .await
        .expect("balance read failed")
        .expect("projection missing");
    assert_eq!(balance.points, 100 - REWARD_COST);
    assert!(balance.points >= 0, "balance must never go negative");

    // Exactly one redemption entry made it into the ledger
    let history = db
        .get_history(&user_id, None, 10)
        .await
        .expect("history read failed");
    let redemptions = history
        .iter()
        .filter(|e| e.kind == loyalty_engine::models::EntryKind::Redemption)
        .count();
    assert_eq!(redemptions, 1);
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Statistical checks on the spin outcome table.
//!
//! Seeded draws, so these are deterministic; the tolerances guard against
//! a broken cumulative walk, not against RNG variance.

use loyalty_engine::models::OutcomeTable;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::HashMap;

const NUM_DRAWS: u64 = 100_000;
const FREQUENCY_TOLERANCE: f64 = 0.01;

fn draw_counts(table: &OutcomeTable, seed: u64) -> HashMap<String, u64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut counts: HashMap<String, u64> = HashMap::new();
    for _ in 0..NUM_DRAWS {
        let outcome = table.resolve(rng.gen::<f64>());
        *counts.entry(outcome.label.clone()).or_default() += 1;
    }
    counts
}

#[test]
fn test_observed_frequencies_match_table() {
    let table = OutcomeTable::default();
    table.validate().unwrap();

    let counts = draw_counts(&table, 12345);

    for outcome in &table.outcomes {
        let observed =
            *counts.get(&outcome.label).unwrap_or(&0) as f64 / NUM_DRAWS as f64;
        assert!(
            (observed - outcome.probability).abs() < FREQUENCY_TOLERANCE,
            "outcome '{}': observed {:.4}, expected {:.4}",
            outcome.label,
            observed,
            outcome.probability
        );
    }
}

#[test]
fn test_jackpot_frequency_stays_rare() {
    let table = OutcomeTable::default();
    let counts = draw_counts(&table, 67890);

    let jackpot_draws: u64 = table
        .outcomes
        .iter()
        .filter(|o| o.jackpot)
        .map(|o| *counts.get(&o.label).unwrap_or(&0))
        .sum();
    let observed = jackpot_draws as f64 / NUM_DRAWS as f64;

    // Configured mass plus tolerance; the table itself caps it at 2%
    assert!(
        observed <= table.jackpot_probability() + FREQUENCY_TOLERANCE,
        "jackpot frequency {:.4} exceeds configured {:.4}",
        observed,
        table.jackpot_probability()
    );
}

#[test]
fn test_empirical_expected_value_matches_table() {
    let table = OutcomeTable::default();
    let counts = draw_counts(&table, 24680);

    let total_points: i64 = table
        .outcomes
        .iter()
        .map(|o| o.points * *counts.get(&o.label).unwrap_or(&0) as i64)
        .sum();
    let empirical_ev = total_points as f64 / NUM_DRAWS as f64;

    assert!(
        (empirical_ev - table.expected_value()).abs() < 1.0,
        "empirical EV {:.3} diverges from table EV {:.3}",
        empirical_ev,
        table.expected_value()
    );
}

#[test]
fn test_every_outcome_is_reachable() {
    let table = OutcomeTable::default();
    let counts = draw_counts(&table, 13579);

    for outcome in &table.outcomes {
        assert!(
            counts.get(&outcome.label).copied().unwrap_or(0) > 0,
            "outcome '{}' was never drawn",
            outcome.label
        );
    }
}

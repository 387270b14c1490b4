// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Daily spin models: cooldown record and weighted outcome table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Allowed floating-point drift when validating that probabilities sum to 1.
const PROBABILITY_SUM_TOLERANCE: f64 = 1e-6;

/// One spin per `(user, UTC day)`.
///
/// Written atomically with the corresponding `spin_award` ledger entry;
/// its existence is the cooldown gate — no separate timer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpinRecord {
    pub user_id: String,
    /// UTC calendar day ("YYYY-MM-DD")
    pub day_key: String,
    pub outcome: String,
    pub points: i64,
    pub jackpot: bool,
    pub created_at: DateTime<Utc>,
}

impl SpinRecord {
    /// Firestore document ID for `(user, day)`.
    pub fn doc_id(user_id: &str, day_key: &str) -> String {
        format!("{}_{}", user_id, day_key)
    }
}

/// One row of the spin outcome table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpinOutcome {
    /// Display label (e.g. "10 bonus points")
    pub label: String,
    pub points: i64,
    /// Probability mass in (0, 1]
    pub probability: f64,
    #[serde(default)]
    pub jackpot: bool,
}

/// Weighted outcome table for the daily spin.
///
/// Tunable configuration, not engine logic: the probabilities must keep
/// both the expected value per spin and the jackpot frequency under the
/// program's external ceilings, which the statistical tests check against
/// this table rather than against hardcoded numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeTable {
    pub outcomes: Vec<SpinOutcome>,
}

impl Default for OutcomeTable {
    fn default() -> Self {
        Self {
            outcomes: vec![
                SpinOutcome {
                    label: "5 points".to_string(),
                    points: 5,
                    probability: 0.40,
                    jackpot: false,
                },
                SpinOutcome {
                    label: "10 points".to_string(),
                    points: 10,
                    probability: 0.30,
                    jackpot: false,
                },
                SpinOutcome {
                    label: "20 points".to_string(),
                    points: 20,
                    probability: 0.20,
                    jackpot: false,
                },
                SpinOutcome {
                    label: "50 points".to_string(),
                    points: 50,
                    probability: 0.08,
                    jackpot: false,
                },
                SpinOutcome {
                    label: "Jackpot! 250 points".to_string(),
                    points: 250,
                    probability: 0.02,
                    jackpot: true,
                },
            ],
        }
    }
}

impl OutcomeTable {
    /// Validate the table: non-empty, positive awards, probabilities in
    /// (0, 1] summing to 1 within tolerance.
    pub fn validate(&self) -> Result<(), TableError> {
        if self.outcomes.is_empty() {
            return Err(TableError::Empty);
        }

        let mut sum = 0.0;
        for outcome in &self.outcomes {
            if outcome.points <= 0 {
                return Err(TableError::NonPositivePoints(outcome.label.clone()));
            }
            if outcome.probability <= 0.0 || outcome.probability > 1.0 {
                return Err(TableError::BadProbability(outcome.label.clone()));
            }
            sum += outcome.probability;
        }

        if (sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
            return Err(TableError::BadSum(sum));
        }

        Ok(())
    }

    /// Resolve a uniform draw in [0, 1) to an outcome by walking the
    /// cumulative probability mass.
    ///
    /// If floating-point drift lets the walk fall through, the
    /// lowest-value outcome is returned; with a valid table this cannot
    /// change the distribution in any measurable way.
    pub fn resolve(&self, draw: f64) -> &SpinOutcome {
        let mut cumulative = 0.0;
        for outcome in &self.outcomes {
            cumulative += outcome.probability;
            if draw < cumulative {
                return outcome;
            }
        }

        self.outcomes
            .iter()
            .min_by_key(|o| o.points)
            .expect("validated table is non-empty")
    }

    /// Total probability mass on jackpot outcomes.
    pub fn jackpot_probability(&self) -> f64 {
        self.outcomes
            .iter()
            .filter(|o| o.jackpot)
            .map(|o| o.probability)
            .sum()
    }

    /// Expected points per spin.
    pub fn expected_value(&self) -> f64 {
        self.outcomes
            .iter()
            .map(|o| o.points as f64 * o.probability)
            .sum()
    }
}

/// Outcome table validation errors.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("Outcome table is empty")]
    Empty,

    #[error("Outcome '{0}' has non-positive points")]
    NonPositivePoints(String),

    #[error("Outcome '{0}' has probability outside (0, 1]")]
    BadProbability(String),

    #[error("Probabilities sum to {0}, expected 1.0")]
    BadSum(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_validates() {
        OutcomeTable::default().validate().unwrap();
    }

    #[test]
    fn test_rejects_bad_probability_sum() {
        let mut table = OutcomeTable::default();
        table.outcomes[0].probability = 0.5;
        assert!(matches!(table.validate(), Err(TableError::BadSum(_))));
    }

    #[test]
    fn test_resolve_boundaries() {
        let table = OutcomeTable::default();

        assert_eq!(table.resolve(0.0).points, 5);
        assert_eq!(table.resolve(0.399).points, 5);
        assert_eq!(table.resolve(0.40).points, 10);
        assert_eq!(table.resolve(0.699).points, 10);
        assert_eq!(table.resolve(0.70).points, 20);
        assert_eq!(table.resolve(0.90).points, 50);
        assert_eq!(table.resolve(0.98).points, 250);
        assert!(table.resolve(0.999).jackpot);
    }

    #[test]
    fn test_fallthrough_returns_lowest_value_outcome() {
        let table = OutcomeTable::default();
        // 1.0 is outside [0, 1) but must still terminate safely
        assert_eq!(table.resolve(1.0).points, 5);
    }

    #[test]
    fn test_expected_value_matches_default_table() {
        let ev = OutcomeTable::default().expected_value();
        assert!((ev - 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_spin_record_doc_id() {
        assert_eq!(
            SpinRecord::doc_id("user1", "2024-03-15"),
            "user1_2024-03-15"
        );
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tier calculator: pure mapping from lifetime points to a loyalty tier.
//!
//! Thresholds are inclusive lower bounds; ties resolve to the higher tier.
//! Lifetime points never decrease, so a user's tier never decreases either.

use serde::{Deserialize, Serialize};

/// Loyalty tier labels, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum Tier {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Bronze => "bronze",
            Tier::Silver => "silver",
            Tier::Gold => "gold",
            Tier::Platinum => "platinum",
        }
    }
}

/// Ascending tier thresholds (lifetime points needed to enter each tier).
const THRESHOLDS: [(Tier, u64); 4] = [
    (Tier::Bronze, 0),
    (Tier::Silver, 500),
    (Tier::Gold, 2_000),
    (Tier::Platinum, 5_000),
];

/// Tier plus progress toward the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierProgress {
    pub tier: Tier,
    /// None once the ceiling tier is reached
    pub next_tier: Option<Tier>,
    pub points_to_next_tier: Option<u64>,
}

/// Compute the tier for a lifetime point total.
pub fn tier_for(lifetime_points: u64) -> TierProgress {
    let mut current = THRESHOLDS[0];
    let mut next = None;

    for (idx, &(tier, threshold)) in THRESHOLDS.iter().enumerate() {
        if lifetime_points >= threshold {
            current = (tier, threshold);
            next = THRESHOLDS.get(idx + 1).copied();
        }
    }

    TierProgress {
        tier: current.0,
        next_tier: next.map(|(t, _)| t),
        points_to_next_tier: next.map(|(_, threshold)| threshold - lifetime_points),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_are_inclusive_lower_bounds() {
        assert_eq!(tier_for(0).tier, Tier::Bronze);
        assert_eq!(tier_for(499).tier, Tier::Bronze);
        assert_eq!(tier_for(500).tier, Tier::Silver);
        assert_eq!(tier_for(1_999).tier, Tier::Silver);
        assert_eq!(tier_for(2_000).tier, Tier::Gold);
        assert_eq!(tier_for(4_999).tier, Tier::Gold);
        assert_eq!(tier_for(5_000).tier, Tier::Platinum);
        assert_eq!(tier_for(1_000_000).tier, Tier::Platinum);
    }

    #[test]
    fn test_progress_to_next_tier() {
        let progress = tier_for(480);
        assert_eq!(progress.tier, Tier::Bronze);
        assert_eq!(progress.next_tier, Some(Tier::Silver));
        assert_eq!(progress.points_to_next_tier, Some(20));
    }

    #[test]
    fn test_ceiling_tier_has_no_progression() {
        let progress = tier_for(7_500);
        assert_eq!(progress.tier, Tier::Platinum);
        assert_eq!(progress.next_tier, None);
        assert_eq!(progress.points_to_next_tier, None);
    }

    #[test]
    fn test_tier_is_monotone_over_increasing_lifetimes() {
        let mut last = Tier::Bronze;
        for lifetime in (0..10_000).step_by(7) {
            let tier = tier_for(lifetime).tier;
            assert!(tier >= last, "tier decreased at lifetime={}", lifetime);
            last = tier;
        }
    }
}

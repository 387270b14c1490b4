// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Reward catalog model and eligibility rules.

use crate::services::tier::Tier;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// A redeemable reward from the catalog file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reward {
    /// Stable reward ID (e.g. "free-delivery")
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Point cost; always positive
    pub points_cost: i64,
    /// Inactive rewards stay in the file but cannot be redeemed
    #[serde(default = "default_active")]
    pub active: bool,
    /// Minimum order subtotal (cents) the redemption must be attached to
    #[serde(default)]
    pub min_subtotal_cents: Option<u64>,
    /// Minimum tier required to redeem
    #[serde(default)]
    pub min_tier: Option<Tier>,
}

fn default_active() -> bool {
    true
}

impl Reward {
    /// Check the reward's eligibility rules against the requesting user.
    ///
    /// Returns a human-readable reason on failure; activity and balance
    /// are checked separately by the redemption service.
    pub fn check_eligibility(
        &self,
        user_tier: Tier,
        order_subtotal_cents: Option<u64>,
    ) -> Result<(), String> {
        if let Some(min_tier) = self.min_tier {
            if user_tier < min_tier {
                return Err(format!(
                    "Reward requires {} tier or above",
                    min_tier.as_str()
                ));
            }
        }

        if let Some(min_subtotal) = self.min_subtotal_cents {
            match order_subtotal_cents {
                Some(subtotal) if subtotal >= min_subtotal => {}
                _ => {
                    return Err(format!(
                        "Reward requires an order subtotal of at least {} cents",
                        min_subtotal
                    ))
                }
            }
        }

        Ok(())
    }
}

/// Reward summary for API responses.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RewardSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub points_cost: i64,
    pub min_subtotal_cents: Option<u64>,
    pub min_tier: Option<Tier>,
}

impl From<&Reward> for RewardSummary {
    fn from(reward: &Reward) -> Self {
        Self {
            id: reward.id.clone(),
            name: reward.name.clone(),
            description: reward.description.clone(),
            points_cost: reward.points_cost,
            min_subtotal_cents: reward.min_subtotal_cents,
            min_tier: reward.min_tier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reward() -> Reward {
        Reward {
            id: "free-dessert".to_string(),
            name: "Free Dessert".to_string(),
            description: String::new(),
            points_cost: 60,
            active: true,
            min_subtotal_cents: Some(1_500),
            min_tier: Some(Tier::Silver),
        }
    }

    #[test]
    fn test_eligibility_requires_min_tier() {
        let err = reward().check_eligibility(Tier::Bronze, Some(2_000)).unwrap_err();
        assert!(err.contains("silver"));
    }

    #[test]
    fn test_eligibility_requires_min_subtotal() {
        let reward = reward();
        assert!(reward.check_eligibility(Tier::Gold, Some(1_000)).is_err());
        assert!(reward.check_eligibility(Tier::Gold, None).is_err());
        assert!(reward.check_eligibility(Tier::Gold, Some(1_500)).is_ok());
    }
}

//! Per-user balance projection derived from the ledger.
//!
//! The projection is the only shared mutable document; it is mutated
//! exclusively inside Firestore transactions alongside the entry that
//! changes it, which is what prevents lost updates under concurrent
//! earns, spins, and redemptions for the same user.

use crate::services::tier::{tier_for, Tier};
use serde::{Deserialize, Serialize};

/// Pre-computed balance summary for a user.
///
/// Stored in `balances`, keyed by user ID; created lazily on the first
/// ledger write and updated transactionally with every subsequent one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceProjection {
    pub user_id: String,

    /// Current redeemable balance. Never negative.
    #[serde(default)]
    pub points: i64,

    /// Sum of all positive earn deltas ever recorded.
    /// Monotonically non-decreasing; redemption and expiration never touch it.
    #[serde(default)]
    pub lifetime_points: u64,

    /// Tier derived from `lifetime_points`; recomputed on every mutation.
    pub tier: Tier,

    /// Denormalized order counters updated alongside `order_earn` entries.
    #[serde(default)]
    pub orders_count: u32,
    #[serde(default)]
    pub total_spent_cents: u64,

    /// Last mutation timestamp (ISO 8601)
    #[serde(default)]
    pub updated_at: String,
}

impl BalanceProjection {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            points: 0,
            lifetime_points: 0,
            tier: Tier::Bronze,
            orders_count: 0,
            total_spent_cents: 0,
            updated_at: String::new(),
        }
    }

    /// Credit points earned from a paid order.
    ///
    /// Returns `true` if the tier label changed.
    pub fn apply_order_earn(&mut self, points: i64, subtotal_cents: u64, now: &str) -> bool {
        debug_assert!(points > 0);
        self.points += points;
        self.lifetime_points += points as u64;
        self.orders_count += 1;
        self.total_spent_cents += subtotal_cents;
        self.touch(now)
    }

    /// Credit points from a spin award.
    pub fn apply_spin_award(&mut self, points: i64, now: &str) -> bool {
        debug_assert!(points > 0);
        self.points += points;
        self.lifetime_points += points as u64;
        self.touch(now)
    }

    /// Debit points for a redemption. The caller must have verified
    /// sufficiency inside the same transaction; this re-checks as the last
    /// line of defense so the projection can never go negative.
    pub fn apply_redemption(&mut self, cost: i64, now: &str) -> Result<(), i64> {
        debug_assert!(cost > 0);
        if self.points < cost {
            return Err(self.points);
        }
        self.points -= cost;
        self.touch(now);
        Ok(())
    }

    /// Apply a signed admin adjustment. Negative adjustments are clamped
    /// to the available balance. Positive adjustments do not count toward
    /// lifetime points (they are corrections, not earnings).
    ///
    /// Returns the delta actually applied.
    pub fn apply_adjustment(&mut self, delta: i64, now: &str) -> i64 {
        let applied = if delta < 0 { delta.max(-self.points) } else { delta };
        self.points += applied;
        self.touch(now);
        applied
    }

    /// Remove lapsed points. The offset is clamped to the available
    /// balance (points may have been spent since they were earned);
    /// lifetime points are untouched — tier progress is permanent.
    ///
    /// Returns the (non-negative) amount actually removed.
    pub fn apply_expiration(&mut self, amount: i64, now: &str) -> i64 {
        debug_assert!(amount > 0);
        let removed = amount.min(self.points);
        self.points -= removed;
        self.touch(now);
        removed
    }

    /// Recompute the tier and stamp the update time.
    /// Returns `true` if the tier label changed.
    fn touch(&mut self, now: &str) -> bool {
        let old_tier = self.tier;
        self.tier = tier_for(self.lifetime_points).tier;
        self.updated_at = now.to_string();
        self.tier != old_tier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: &str = "2024-03-15T12:00:00Z";

    #[test]
    fn test_order_earn_updates_all_counters() {
        let mut balance = BalanceProjection::new("user1");
        let tier_changed = balance.apply_order_earn(25, 25_000, NOW);

        assert!(!tier_changed);
        assert_eq!(balance.points, 25);
        assert_eq!(balance.lifetime_points, 25);
        assert_eq!(balance.orders_count, 1);
        assert_eq!(balance.total_spent_cents, 25_000);
        assert_eq!(balance.updated_at, NOW);
    }

    #[test]
    fn test_earn_crossing_silver_threshold_reports_tier_change() {
        let mut balance = BalanceProjection::new("user1");
        balance.points = 480;
        balance.lifetime_points = 480;

        let tier_changed = balance.apply_order_earn(25, 25_000, NOW);

        assert!(tier_changed);
        assert_eq!(balance.lifetime_points, 505);
        assert_eq!(balance.tier, Tier::Silver);
    }

    #[test]
    fn test_redemption_rejects_insufficient_balance() {
        let mut balance = BalanceProjection::new("user1");
        balance.points = 40;

        let err = balance.apply_redemption(60, NOW).unwrap_err();
        assert_eq!(err, 40);
        assert_eq!(balance.points, 40, "failed redemption must not mutate");
    }

    #[test]
    fn test_redemption_never_touches_lifetime_points() {
        let mut balance = BalanceProjection::new("user1");
        balance.apply_order_earn(100, 100_000, NOW);

        balance.apply_redemption(60, NOW).unwrap();

        assert_eq!(balance.points, 40);
        assert_eq!(balance.lifetime_points, 100);
    }

    #[test]
    fn test_expiration_clamps_to_available_balance() {
        let mut balance = BalanceProjection::new("user1");
        balance.apply_order_earn(30, 30_000, NOW);
        balance.apply_redemption(20, NOW).unwrap();

        // 30 earned, 20 spent: only 10 remain to lapse
        let removed = balance.apply_expiration(30, NOW);

        assert_eq!(removed, 10);
        assert_eq!(balance.points, 0);
        assert_eq!(balance.lifetime_points, 30);
    }

    #[test]
    fn test_negative_adjustment_clamps() {
        let mut balance = BalanceProjection::new("user1");
        balance.apply_order_earn(15, 15_000, NOW);

        let applied = balance.apply_adjustment(-50, NOW);

        assert_eq!(applied, -15);
        assert_eq!(balance.points, 0);
    }

    #[test]
    fn test_positive_adjustment_does_not_count_toward_lifetime() {
        let mut balance = BalanceProjection::new("user1");
        let applied = balance.apply_adjustment(100, NOW);

        assert_eq!(applied, 100);
        assert_eq!(balance.points, 100);
        assert_eq!(balance.lifetime_points, 0);
        assert_eq!(balance.tier, Tier::Bronze);
    }
}

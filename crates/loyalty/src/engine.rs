//! Core loyalty engine: tier resolution, point accrual, and redemption
//! bookkeeping on a `LoyaltyAccount`.

use orbi_core::config::LoyaltyConfig;
use orbi_core::error::{OrbiError, OrbiResult};
use orbi_core::loyalty::*;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, info};

/// Points awarded for a charge: one per `units_per_point` currency units,
/// truncated.
pub fn points_for_amount(amount: Decimal, units_per_point: u32) -> u64 {
    if amount <= Decimal::ZERO || units_per_point == 0 {
        return 0;
    }
    (amount / Decimal::from(units_per_point))
        .floor()
        .to_u64()
        .unwrap_or(0)
}

/// Loyalty program engine — stateless computation over LoyaltyAccount data.
///
/// Every operation takes the current account by reference and returns the
/// updated copy; persisting it is the ledger's job.
#[derive(Debug, Clone)]
pub struct LoyaltyEngine {
    config: LoyaltyConfig,
}

impl LoyaltyEngine {
    pub fn new(config: &LoyaltyConfig) -> Self {
        info!(
            silver = config.silver_threshold,
            gold = config.gold_threshold,
            platinum = config.platinum_threshold,
            units_per_point = config.currency_units_per_point,
            "Loyalty engine initialized"
        );
        Self {
            config: config.clone(),
        }
    }

    /// Lifetime points at which `tier` starts.
    pub fn tier_threshold(&self, tier: LoyaltyTier) -> u64 {
        match tier {
            LoyaltyTier::Bronze => 0,
            LoyaltyTier::Silver => self.config.silver_threshold,
            LoyaltyTier::Gold => self.config.gold_threshold,
            LoyaltyTier::Platinum => self.config.platinum_threshold,
        }
    }

    pub fn discount_percent(&self, tier: LoyaltyTier) -> u32 {
        match tier {
            LoyaltyTier::Bronze => self.config.bronze_discount_percent,
            LoyaltyTier::Silver => self.config.silver_discount_percent,
            LoyaltyTier::Gold => self.config.gold_discount_percent,
            LoyaltyTier::Platinum => self.config.platinum_discount_percent,
        }
    }

    /// Tier for a lifetime-earned total. Lower bounds are inclusive.
    pub fn tier_and_discount_for(&self, total_earned: u64) -> TierStatus {
        let tier = if total_earned >= self.config.platinum_threshold {
            LoyaltyTier::Platinum
        } else if total_earned >= self.config.gold_threshold {
            LoyaltyTier::Gold
        } else if total_earned >= self.config.silver_threshold {
            LoyaltyTier::Silver
        } else {
            LoyaltyTier::Bronze
        };
        TierStatus {
            tier,
            discount_percent: self.discount_percent(tier),
        }
    }

    /// Points still needed to reach the next tier; `None` at the top tier.
    pub fn points_to_next_tier(&self, total_earned: u64) -> Option<u64> {
        let current = self.tier_and_discount_for(total_earned).tier;
        current
            .next()
            .map(|next| self.tier_threshold(next).saturating_sub(total_earned))
    }

    pub fn points_for_amount(&self, amount: Decimal) -> u64 {
        points_for_amount(amount, self.config.currency_units_per_point)
    }

    /// Accrue points for a completed charge.
    pub fn accrue_points(
        &self,
        account: &LoyaltyAccount,
        charged_amount: Decimal,
    ) -> OrbiResult<(LoyaltyAccount, AccrualReceipt)> {
        if charged_amount < Decimal::ZERO {
            return Err(OrbiError::InvalidAmount(charged_amount));
        }

        let points_added = self.points_for_amount(charged_amount);
        let mut updated = account.clone();
        updated.total_earned = account.total_earned.saturating_add(points_added);
        updated.points = account.points.saturating_add(points_added);
        // Never demote: tier follows total_earned, which only grows.
        updated.tier = self
            .tier_and_discount_for(updated.total_earned)
            .tier
            .max(account.tier);

        let tier_changed = updated.tier != account.tier;

        debug!(
            user_id = %account.user_id,
            charged = %charged_amount,
            points_added,
            balance = updated.points,
            tier = ?updated.tier,
            "Points accrued"
        );

        let receipt = AccrualReceipt {
            user_id: account.user_id.clone(),
            charged_amount,
            points_added,
            new_balance: updated.points,
            tier: updated.tier,
            tier_changed,
        };
        Ok((updated, receipt))
    }

    /// Deduct redeemed points. Lifetime earnings and tier are untouched.
    pub fn redeem_points(&self, account: &LoyaltyAccount, points: u64) -> OrbiResult<LoyaltyAccount> {
        if points > account.points {
            return Err(OrbiError::InsufficientPoints {
                requested: points,
                available: account.points,
            });
        }

        let mut updated = account.clone();
        updated.points -= points;
        updated.total_redeemed = account.total_redeemed.saturating_add(points);

        debug!(
            user_id = %account.user_id,
            points,
            balance = updated.points,
            "Points redeemed"
        );
        Ok(updated)
    }
}

//! Points ↔ currency conversion and the redemption cap.

use orbi_core::config::RedemptionConfig;
use orbi_core::error::{OrbiError, OrbiResult};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RedemptionCalculator {
    config: RedemptionConfig,
}

impl Default for RedemptionCalculator {
    fn default() -> Self {
        Self::new(&RedemptionConfig::default())
    }
}

impl RedemptionCalculator {
    pub fn new(config: &RedemptionConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Currency discount for `points` (10 points = 1 unit by default). A zero
    /// rate makes points worth nothing.
    pub fn discount_for_points(&self, points: u64) -> Decimal {
        Decimal::from(points)
            .checked_div(Decimal::from(self.config.points_per_currency_unit))
            .unwrap_or(Decimal::ZERO)
    }

    /// Points that cover the capped share of `order_subtotal`, before the
    /// balance is considered.
    fn cap_points(&self, order_subtotal: Decimal) -> u64 {
        if order_subtotal <= Decimal::ZERO {
            return 0;
        }
        (order_subtotal * Decimal::from(self.config.max_redeem_percent) / Decimal::ONE_HUNDRED
            * Decimal::from(self.config.points_per_currency_unit))
        .floor()
        .to_u64()
        .unwrap_or(0)
    }

    /// Largest redeemable amount: the balance, bounded by the cap, rounded
    /// down to the redemption step. Zero means no discount applies.
    pub fn max_redeemable_points(&self, available_points: u64, order_subtotal: Decimal) -> u64 {
        let max = available_points.min(self.cap_points(order_subtotal));
        match max.checked_rem(self.config.redeem_step) {
            Some(rest) => max - rest,
            None => max,
        }
    }

    /// Bring a requested redemption within the cap. Clamps silently unless
    /// `strict_cap` is set.
    pub fn clamp_request(&self, requested: u64, order_subtotal: Decimal) -> OrbiResult<u64> {
        let allowed = self.max_redeemable_points(requested, order_subtotal);
        if self.config.strict_cap {
            let cap = self.max_redeemable_points(u64::MAX, order_subtotal);
            if requested > cap {
                return Err(OrbiError::CapExceeded {
                    requested,
                    max: cap,
                });
            }
        }
        if allowed != requested {
            debug!(requested, allowed, subtotal = %order_subtotal, "Redemption clamped");
        }
        Ok(allowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discount_for_points() {
        let calc = RedemptionCalculator::default();
        assert_eq!(calc.discount_for_points(200), Decimal::from(20));
        assert_eq!(calc.discount_for_points(15), Decimal::new(15, 1));
    }

    #[test]
    fn test_cap_is_half_of_subtotal() {
        let calc = RedemptionCalculator::default();
        let max = calc.max_redeemable_points(10_000, Decimal::from(100));
        assert_eq!(max, 500);
        assert!(calc.discount_for_points(max) <= Decimal::from(50));
    }

    #[test]
    fn test_balance_bounds_redemption() {
        let calc = RedemptionCalculator::default();
        assert_eq!(calc.max_redeemable_points(205, Decimal::from(1000)), 200);
    }

    #[test]
    fn test_rounds_down_to_step() {
        let calc = RedemptionCalculator::default();
        // cap = floor(33.3 * 0.5 * 10) = 166 → 160
        assert_eq!(calc.max_redeemable_points(10_000, Decimal::new(333, 1)), 160);
    }

    #[test]
    fn test_small_subtotal_yields_zero() {
        let calc = RedemptionCalculator::default();
        assert_eq!(calc.max_redeemable_points(1000, Decimal::new(19, 1)), 0);
        assert_eq!(calc.max_redeemable_points(1000, Decimal::ZERO), 0);
        assert_eq!(calc.max_redeemable_points(1000, Decimal::from(-10)), 0);
    }

    #[test]
    fn test_clamp_request_silently() {
        let calc = RedemptionCalculator::default();
        assert_eq!(calc.clamp_request(900, Decimal::from(100)).unwrap(), 500);
        assert_eq!(calc.clamp_request(200, Decimal::from(100)).unwrap(), 200);
    }

    #[test]
    fn test_strict_cap_rejects() {
        let calc = RedemptionCalculator::new(&RedemptionConfig {
            strict_cap: true,
            ..RedemptionConfig::default()
        });
        let err = calc.clamp_request(900, Decimal::from(100)).unwrap_err();
        assert!(matches!(err, OrbiError::CapExceeded { requested: 900, max: 500 }));
        assert_eq!(calc.clamp_request(500, Decimal::from(100)).unwrap(), 500);
    }

    #[test]
    fn test_zero_rate_and_step_do_not_panic() {
        let calc = RedemptionCalculator::new(&RedemptionConfig {
            points_per_currency_unit: 0,
            redeem_step: 0,
            ..RedemptionConfig::default()
        });
        assert_eq!(calc.discount_for_points(200), Decimal::ZERO);
        assert_eq!(calc.max_redeemable_points(205, Decimal::from(1000)), 0);

        let unstepped = RedemptionCalculator::new(&RedemptionConfig {
            redeem_step: 0,
            ..RedemptionConfig::default()
        });
        assert_eq!(unstepped.max_redeemable_points(205, Decimal::from(1000)), 205);
    }
}

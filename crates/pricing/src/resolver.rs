//! Discount stacking: tier, promo, and points discounts against one base price.
//!
//! All three discounts are computed from the same base and subtracted; none
//! compounds on another. The points cap is chained against what remains after
//! the tier and promo discounts.

use orbi_core::config::AppConfig;
use orbi_core::error::OrbiResult;
use orbi_core::promo::PromoDiscount;
use orbi_core::types::BookingPriceResult;
use orbi_loyalty::engine::points_for_amount;
use orbi_loyalty::RedemptionCalculator;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountRequest {
    pub base_price: Decimal,
    pub tier_discount_percent: u32,
    pub points_to_redeem: u64,
    pub apply_tier_discount: bool,
    pub apply_points_redemption: bool,
    #[serde(default)]
    pub promo: Option<PromoDiscount>,
}

#[derive(Debug, Clone)]
pub struct DiscountResolver {
    redemption: RedemptionCalculator,
    units_per_point: u32,
}

impl Default for DiscountResolver {
    fn default() -> Self {
        Self::new(&AppConfig::default())
    }
}

impl DiscountResolver {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            redemption: RedemptionCalculator::new(&config.redemption),
            units_per_point: config.loyalty.currency_units_per_point,
        }
    }

    pub fn redemption(&self) -> &RedemptionCalculator {
        &self.redemption
    }

    /// Tier discount in whole currency units, half rounded up.
    pub fn tier_discount(&self, base_price: Decimal, percent: u32) -> Decimal {
        if base_price <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (base_price * Decimal::from(percent.min(100)) / Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Stack the requested discounts. Fails only when `strict_cap` is set and
    /// the points request is over the cap.
    pub fn resolve(&self, request: &DiscountRequest) -> OrbiResult<BookingPriceResult> {
        let base = request.base_price;
        let tier = if request.apply_tier_discount {
            self.tier_discount(base, request.tier_discount_percent)
        } else {
            Decimal::ZERO
        };
        let promo = request
            .promo
            .as_ref()
            .map(|p| p.amount_for(base))
            .unwrap_or(Decimal::ZERO);

        let points_redeemed = if request.apply_points_redemption {
            self.redemption
                .clamp_request(request.points_to_redeem, base - tier - promo)?
        } else {
            0
        };

        Ok(self.finish(base, tier, promo, points_redeemed))
    }

    fn finish(
        &self,
        base_price: Decimal,
        tier_discount_amount: Decimal,
        promo_discount_amount: Decimal,
        points_redeemed: u64,
    ) -> BookingPriceResult {
        let points_discount_amount = self.redemption.discount_for_points(points_redeemed);
        let final_total = (base_price
            - tier_discount_amount
            - promo_discount_amount
            - points_discount_amount)
            .max(Decimal::ZERO);
        let points_earned = points_for_amount(final_total, self.units_per_point);

        metrics::counter!("pricing.bookings_resolved").increment(1);
        debug!(
            base = %base_price,
            tier = %tier_discount_amount,
            promo = %promo_discount_amount,
            points = %points_discount_amount,
            final_total = %final_total,
            points_earned,
            "Booking price resolved"
        );

        BookingPriceResult {
            base_price,
            tier_discount_amount,
            promo_discount_amount,
            points_discount_amount,
            points_redeemed,
            final_total,
            points_earned,
        }
    }
}

/// Tier and points stacking with the default program rules; over-cap point
/// requests are clamped.
pub fn resolve_booking_price(
    base_price: Decimal,
    tier_discount_percent: u32,
    points_to_redeem: u64,
    apply_tier_discount: bool,
    apply_points_redemption: bool,
) -> BookingPriceResult {
    let resolver = DiscountResolver::default();
    let tier = if apply_tier_discount {
        resolver.tier_discount(base_price, tier_discount_percent)
    } else {
        Decimal::ZERO
    };
    let points_redeemed = if apply_points_redemption {
        resolver
            .redemption
            .max_redeemable_points(points_to_redeem, base_price - tier)
    } else {
        0
    };
    resolver.finish(base_price, tier, Decimal::ZERO, points_redeemed)
}

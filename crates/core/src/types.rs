//! Rate tables and booking price types shared by the pricing and loyalty crates.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ─── Rate Tables ────────────────────────────────────────────────────────────

/// Default nightly rate for a unit category. Edited by the admin back-office;
/// read-only here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApartmentRate {
    pub apartment_type: String,
    pub price_per_night: Decimal,
    pub max_guests: u32,
}

/// Month-specific nightly rate that replaces the base rate for every date in
/// that `(apartment_type, month, year)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeasonalOverride {
    pub apartment_type: String,
    /// 1–12.
    pub month: u32,
    pub year: i32,
    pub price_per_night: Decimal,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl SeasonalOverride {
    pub fn matches(&self, apartment_type: &str, month: u32, year: i32) -> bool {
        self.is_active
            && self.month == month
            && self.year == year
            && self.apartment_type == apartment_type
    }
}

// ─── Stay ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StayRequest {
    pub apartment_type: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: u32,
}

impl StayRequest {
    /// Nights in `[check_in, check_out)`. Zero or negative for an invalid range.
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceBreakdownEntry {
    pub date: NaiveDate,
    pub price_for_night: Decimal,
}

/// Priced stay: the total plus the per-night decomposition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StayQuote {
    pub apartment_type: String,
    pub nights: u32,
    pub total: Decimal,
    pub breakdown: Vec<PriceBreakdownEntry>,
    /// More than one distinct nightly price: show the per-night table instead
    /// of a flat "rate × nights" line.
    pub has_varied_prices: bool,
}

impl StayQuote {
    /// Nightly rate for the flat summary, rounded to cents.
    pub fn average_nightly_rate(&self) -> Decimal {
        if self.nights == 0 {
            return Decimal::ZERO;
        }
        (self.total / Decimal::from(self.nights)).round_dp(2)
    }
}

// ─── Booking Price ──────────────────────────────────────────────────────────

/// Outcome of stacking tier, promo, and points discounts on a base price.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingPriceResult {
    pub base_price: Decimal,
    pub tier_discount_amount: Decimal,
    pub promo_discount_amount: Decimal,
    pub points_discount_amount: Decimal,
    /// Points actually consumed after the redemption cap was applied.
    pub points_redeemed: u64,
    pub final_total: Decimal,
    pub points_earned: u64,
}

impl BookingPriceResult {
    pub fn total_discount(&self) -> Decimal {
        self.tier_discount_amount + self.promo_discount_amount + self.points_discount_amount
    }
}

/// The two fields the booking record stores (`total_price`, `discount_amount`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BookingAmounts {
    pub total_price: Decimal,
    pub discount_amount: Decimal,
}

impl From<&BookingPriceResult> for BookingAmounts {
    fn from(result: &BookingPriceResult) -> Self {
        Self {
            total_price: result.final_total,
            discount_amount: result.total_discount(),
        }
    }
}

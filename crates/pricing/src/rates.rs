//! Nightly rate resolution.

use chrono::{Datelike, NaiveDate};
use orbi_core::error::{OrbiError, OrbiResult};
use orbi_core::types::{ApartmentRate, SeasonalOverride};
use rust_decimal::Decimal;

/// Base rate row for `apartment_type`.
pub fn base_rate<'a>(apartment_type: &str, base_rates: &'a [ApartmentRate]) -> OrbiResult<&'a ApartmentRate> {
    base_rates
        .iter()
        .find(|r| r.apartment_type == apartment_type)
        .ok_or_else(|| OrbiError::NotFound(apartment_type.to_string()))
}

/// Nightly price for one date: the first active seasonal override for the
/// date's month and year, else the base rate.
pub fn rate_for_date(
    apartment_type: &str,
    date: NaiveDate,
    base_rates: &[ApartmentRate],
    seasonal_overrides: &[SeasonalOverride],
) -> OrbiResult<Decimal> {
    let base = base_rate(apartment_type, base_rates)?;
    Ok(seasonal_price(apartment_type, date, seasonal_overrides).unwrap_or(base.price_per_night))
}

pub(crate) fn seasonal_price(
    apartment_type: &str,
    date: NaiveDate,
    seasonal_overrides: &[SeasonalOverride],
) -> Option<Decimal> {
    // Duplicates for the same key are possible from the admin UI; input order wins.
    seasonal_overrides
        .iter()
        .find(|o| o.matches(apartment_type, date.month(), date.year()))
        .map(|o| o.price_per_night)
}

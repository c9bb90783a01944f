//! Stay price aggregation over `[check_in, check_out)`.

use std::collections::HashSet;

use orbi_core::error::{OrbiError, OrbiResult};
use orbi_core::types::{ApartmentRate, PriceBreakdownEntry, SeasonalOverride, StayQuote, StayRequest};
use rust_decimal::Decimal;
use tracing::debug;

use crate::rates::{base_rate, seasonal_price};

/// Price every night of the stay and total it.
pub fn price_stay(
    stay: &StayRequest,
    base_rates: &[ApartmentRate],
    seasonal_overrides: &[SeasonalOverride],
) -> OrbiResult<StayQuote> {
    if stay.check_out <= stay.check_in {
        return Err(OrbiError::InvalidRange {
            check_in: stay.check_in,
            check_out: stay.check_out,
        });
    }

    let base = base_rate(&stay.apartment_type, base_rates)?;
    if stay.guests == 0 || stay.guests > base.max_guests {
        return Err(OrbiError::InvalidGuests {
            apartment_type: stay.apartment_type.clone(),
            guests: stay.guests,
            max_guests: base.max_guests,
        });
    }

    let mut total = Decimal::ZERO;
    let mut breakdown = Vec::new();
    for date in stay.check_in.iter_days().take_while(|d| *d < stay.check_out) {
        let price_for_night =
            seasonal_price(&stay.apartment_type, date, seasonal_overrides).unwrap_or(base.price_per_night);
        total += price_for_night;
        breakdown.push(PriceBreakdownEntry {
            date,
            price_for_night,
        });
    }

    let distinct: HashSet<Decimal> = breakdown.iter().map(|e| e.price_for_night.normalize()).collect();
    let quote = StayQuote {
        apartment_type: stay.apartment_type.clone(),
        nights: breakdown.len() as u32,
        total,
        has_varied_prices: distinct.len() > 1,
        breakdown,
    };

    metrics::counter!("pricing.stays_priced").increment(1);
    debug!(
        apartment_type = %quote.apartment_type,
        nights = quote.nights,
        total = %quote.total,
        varied = quote.has_varied_prices,
        "Stay priced"
    );
    Ok(quote)
}

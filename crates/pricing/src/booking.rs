//! Booking pricer — prices one booking request end to end and commits the
//! loyalty side of a confirmed booking.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use orbi_core::config::AppConfig;
use orbi_core::error::{OrbiError, OrbiResult};
use orbi_core::event_bus::{EventSink, LedgerEvent, LedgerEventType};
use orbi_core::loyalty::{SettlementReceipt, TierStatus};
use orbi_core::promo::{PromoContext, PromoDiscount, PromoValidator};
use orbi_core::store::RateSource;
use orbi_core::types::{BookingAmounts, BookingPriceResult, StayQuote, StayRequest};
use orbi_loyalty::LoyaltyLedger;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::resolver::{DiscountRequest, DiscountResolver};
use crate::stay::price_stay;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingQuoteRequest {
    pub stay: StayRequest,
    /// Signed-in guest; anonymous bookings get no loyalty discounts.
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub points_to_redeem: u64,
    #[serde(default = "default_true")]
    pub apply_tier_discount: bool,
    #[serde(default)]
    pub apply_points_redemption: bool,
    #[serde(default)]
    pub promo_code: Option<String>,
    /// Date the promo window is checked against; today when absent.
    #[serde(default)]
    pub booked_on: Option<NaiveDate>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingQuote {
    pub stay: StayQuote,
    pub tier: Option<TierStatus>,
    pub available_points: u64,
    /// Slider bound for the redemption control.
    pub max_redeemable_points: u64,
    pub promo: Option<PromoDiscount>,
    /// Booking date and nights the promo was accepted for.
    #[serde(default)]
    pub promo_context: Option<PromoContext>,
    pub price: BookingPriceResult,
}

impl BookingQuote {
    pub fn amounts(&self) -> BookingAmounts {
        BookingAmounts::from(&self.price)
    }
}

pub struct BookingPricer {
    rates: Arc<dyn RateSource>,
    ledger: Arc<LoyaltyLedger>,
    promos: Arc<dyn PromoValidator>,
    events: Arc<dyn EventSink>,
    resolver: DiscountResolver,
}

impl BookingPricer {
    pub fn new(
        config: &AppConfig,
        rates: Arc<dyn RateSource>,
        ledger: Arc<LoyaltyLedger>,
        promos: Arc<dyn PromoValidator>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        info!("Booking pricer initialized");
        Self {
            rates,
            ledger,
            promos,
            events,
            resolver: DiscountResolver::new(config),
        }
    }

    pub fn quote(&self, request: &BookingQuoteRequest) -> OrbiResult<BookingQuote> {
        let stay = &request.stay;
        let base_rates = self.rates.apartment_rates()?;
        let mut overrides = Vec::new();
        for year in stay.check_in.year()..=stay.check_out.year() {
            overrides.extend(self.rates.seasonal_overrides(year, true)?);
        }
        let stay_quote = price_stay(stay, &base_rates, &overrides)?;

        let (tier, available_points) = match &request.user_id {
            Some(user_id) => {
                let account = self.ledger.account(user_id)?;
                let earned = account.as_ref().map(|a| a.total_earned).unwrap_or(0);
                let points = account.as_ref().map(|a| a.points).unwrap_or(0);
                (Some(self.ledger.engine().tier_and_discount_for(earned)), points)
            }
            None => (None, 0),
        };

        if request.apply_points_redemption && request.points_to_redeem > available_points {
            return Err(OrbiError::InsufficientPoints {
                requested: request.points_to_redeem,
                available: available_points,
            });
        }

        let (promo, promo_context) = match request.promo_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => {
                let ctx = PromoContext {
                    today: request.booked_on.unwrap_or_else(|| Utc::now().date_naive()),
                    nights: stay_quote.nights,
                };
                (Some(self.promos.validate(code, &ctx)?), Some(ctx))
            }
            _ => (None, None),
        };

        let price = self.resolver.resolve(&DiscountRequest {
            base_price: stay_quote.total,
            tier_discount_percent: tier.map(|t| t.discount_percent).unwrap_or(0),
            points_to_redeem: request.points_to_redeem,
            apply_tier_discount: request.apply_tier_discount && tier.is_some(),
            apply_points_redemption: request.apply_points_redemption,
            promo: promo.clone(),
        })?;

        let payable_before_points = price.base_price - price.tier_discount_amount - price.promo_discount_amount;
        let max_redeemable_points = self
            .resolver
            .redemption()
            .max_redeemable_points(available_points, payable_before_points);

        self.events.emit(
            LedgerEvent::new(LedgerEventType::BookingPriced, request.user_id.clone())
                .with_amount(price.final_total)
                .with_points(price.points_earned),
        );
        debug!(
            apartment_type = %stay.apartment_type,
            nights = stay_quote.nights,
            final_total = %price.final_total,
            "Booking quoted"
        );

        Ok(BookingQuote {
            stay: stay_quote,
            tier,
            available_points,
            max_redeemable_points,
            promo,
            promo_context,
            price,
        })
    }

    /// Commit a confirmed booking: take the promo use, then redeem and
    /// accrue points in one ledger write. The promo use is released again if
    /// the ledger write fails.
    pub fn settle(&self, user_id: &str, quote: &BookingQuote) -> OrbiResult<SettlementReceipt> {
        let reserved = match &quote.promo {
            Some(promo) => {
                let ctx = quote.promo_context.unwrap_or_else(|| PromoContext {
                    today: Utc::now().date_naive(),
                    nights: quote.stay.nights,
                });
                self.promos.record_use(&promo.code, &ctx)?;
                Some(promo.code.as_str())
            }
            None => None,
        };

        let receipt = match self
            .ledger
            .settle(user_id, quote.price.points_redeemed, quote.price.final_total)
        {
            Ok(receipt) => receipt,
            Err(e) => {
                if let Some(code) = reserved {
                    if let Err(release) = self.promos.release_use(code) {
                        warn!(code, error = %release, "Failed to release promo use");
                    }
                }
                return Err(e);
            }
        };
        info!(
            user_id,
            redeemed = quote.price.points_redeemed,
            earned = receipt.accrual.points_added,
            balance = receipt.account.points,
            "Booking settled"
        );
        Ok(receipt)
    }

    /// Price without loyalty or promo, e.g. for the availability calendar.
    pub fn list_price(&self, stay: &StayRequest) -> OrbiResult<Decimal> {
        let request = BookingQuoteRequest {
            stay: stay.clone(),
            user_id: None,
            points_to_redeem: 0,
            apply_tier_discount: false,
            apply_points_redemption: false,
            promo_code: None,
            booked_on: None,
        };
        Ok(self.quote(&request)?.price.final_total)
    }
}

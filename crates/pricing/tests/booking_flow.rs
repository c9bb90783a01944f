//! End-to-end booking flow: rate catalog → quote → settlement on the ledger.

use std::sync::Arc;

use chrono::NaiveDate;
use orbi_core::config::AppConfig;
use orbi_core::event_bus::{capture_sink, CaptureSink, LedgerEventType};
use orbi_core::loyalty::LoyaltyTier;
use orbi_core::promo::PromoCatalog;
use orbi_core::store::{InMemoryLoyaltyStore, LoyaltyStore, RateCatalog};
use orbi_core::types::StayRequest;
use orbi_core::OrbiError;
use orbi_loyalty::LoyaltyLedger;
use orbi_pricing::{BookingPricer, BookingQuoteRequest};
use rust_decimal::Decimal;

const CATALOG: &str = r#"{
    "apartments": [
        {"apartment_type": "sea_view_suite", "price_per_night": 150, "max_guests": 4},
        {"apartment_type": "studio", "price_per_night": 100, "max_guests": 2}
    ],
    "seasonal_overrides": [
        {"apartment_type": "studio", "month": 7, "year": 2026, "price_per_night": 150},
        {"apartment_type": "studio", "month": 7, "year": 2026, "price_per_night": 999},
        {"apartment_type": "sea_view_suite", "month": 8, "year": 2026, "price_per_night": 400, "is_active": false}
    ],
    "promo_codes": [
        {"code": "BATUMI5", "discount": {"type": "fixed", "value": 5}, "max_uses": 1},
        {"code": "SUMMER", "discount": {"type": "percentage", "value": 10},
         "valid_from": "2026-06-01", "valid_until": "2026-08-31", "min_nights": 3}
    ]
}"#;

struct Harness {
    pricer: BookingPricer,
    ledger: Arc<LoyaltyLedger>,
    store: Arc<InMemoryLoyaltyStore>,
    promos: Arc<PromoCatalog>,
    sink: Arc<CaptureSink>,
}

fn harness() -> Harness {
    let config = AppConfig::default();
    let catalog = RateCatalog::from_json(CATALOG).unwrap();
    let promos = Arc::new(PromoCatalog::with_codes(catalog.promo_codes.clone()));
    let store = Arc::new(InMemoryLoyaltyStore::new());
    let sink = capture_sink();
    let ledger = Arc::new(LoyaltyLedger::new(&config, store.clone(), sink.clone()));
    let pricer = BookingPricer::new(&config, Arc::new(catalog), ledger.clone(), promos.clone(), sink.clone());
    Harness {
        pricer,
        ledger,
        store,
        promos,
        sink,
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn request(apartment: &str, check_in: NaiveDate, check_out: NaiveDate) -> BookingQuoteRequest {
    BookingQuoteRequest {
        stay: StayRequest {
            apartment_type: apartment.to_string(),
            check_in,
            check_out,
            guests: 2,
        },
        user_id: Some("guest-42".to_string()),
        points_to_redeem: 0,
        apply_tier_discount: true,
        apply_points_redemption: false,
        promo_code: None,
        booked_on: Some(date(2026, 5, 1)),
    }
}

#[test]
fn test_gold_member_books_four_nights() {
    let h = harness();
    // 1500 lifetime points: gold.
    h.ledger.accrue("guest-42", Decimal::from(15_000)).unwrap();

    let mut req = request("sea_view_suite", date(2026, 8, 10), date(2026, 8, 14));
    req.points_to_redeem = 200;
    req.apply_points_redemption = true;

    let quote = h.pricer.quote(&req).unwrap();
    assert_eq!(quote.stay.total, Decimal::from(600));
    assert!(!quote.stay.has_varied_prices);
    assert_eq!(quote.tier.unwrap().tier, LoyaltyTier::Gold);
    assert_eq!(quote.price.tier_discount_amount, Decimal::from(90));
    assert_eq!(quote.price.points_discount_amount, Decimal::from(20));
    assert_eq!(quote.price.final_total, Decimal::from(490));
    assert_eq!(quote.price.points_earned, 49);
    assert_eq!(quote.max_redeemable_points, 1500);

    let receipt = h.pricer.settle("guest-42", &quote).unwrap();
    assert_eq!(receipt.accrual.points_added, 49);
    let account = h.store.get("guest-42").unwrap().unwrap();
    assert_eq!(account.points, 1500 - 200 + 49);
    assert_eq!(account.total_earned, 1549);
    assert_eq!(account.total_redeemed, 200);
    assert!(account.is_balanced());
    assert_eq!(h.sink.count_type(LedgerEventType::BookingPriced), 1);
}

#[test]
fn test_varied_rates_use_first_override() {
    let h = harness();
    let mut req = request("studio", date(2026, 6, 29), date(2026, 7, 2));
    req.user_id = None;

    let quote = h.pricer.quote(&req).unwrap();
    let prices: Vec<_> = quote.stay.breakdown.iter().map(|e| e.price_for_night).collect();
    assert_eq!(prices, vec![Decimal::from(100), Decimal::from(100), Decimal::from(150)]);
    assert_eq!(quote.stay.total, Decimal::from(350));
    assert!(quote.stay.has_varied_prices);
}

#[test]
fn test_promo_code_single_use() {
    let h = harness();
    let mut req = request("studio", date(2026, 6, 1), date(2026, 6, 3));
    req.promo_code = Some("batumi5".to_string());

    let quote = h.pricer.quote(&req).unwrap();
    // 200 base, bronze 5% = 10, promo 5.
    assert_eq!(quote.price.final_total, Decimal::from(185));
    assert_eq!(quote.price.points_earned, 18);
    h.pricer.settle("guest-42", &quote).unwrap();

    let err = h.pricer.quote(&req).unwrap_err();
    assert!(matches!(err, OrbiError::InvalidPromo(_)));
}

#[test]
fn test_failed_settlement_releases_promo_use() {
    let h = harness();
    h.ledger.accrue("guest-42", Decimal::from(1000)).unwrap();

    let mut req = request("studio", date(2026, 6, 1), date(2026, 6, 3));
    req.promo_code = Some("BATUMI5".to_string());
    req.points_to_redeem = 100;
    req.apply_points_redemption = true;
    let quote = h.pricer.quote(&req).unwrap();
    assert_eq!(quote.price.points_redeemed, 100);

    // Another booking spends the balance before this one settles.
    h.ledger.redeem("guest-42", 100).unwrap();

    let err = h.pricer.settle("guest-42", &quote).unwrap_err();
    assert!(matches!(err, OrbiError::InsufficientPoints { requested: 100, available: 0 }));
    assert_eq!(h.promos.get("BATUMI5").unwrap().current_uses, 0);

    let account = h.store.get("guest-42").unwrap().unwrap();
    assert_eq!(account.points, 0);
    assert_eq!(account.total_earned, 100);

    // The single-use code is still available for a booking that commits.
    req.points_to_redeem = 0;
    req.apply_points_redemption = false;
    let retry = h.pricer.quote(&req).unwrap();
    h.pricer.settle("guest-42", &retry).unwrap();
    assert_eq!(h.promos.get("BATUMI5").unwrap().current_uses, 1);
}

#[test]
fn test_settlement_checks_promo_on_quoted_booking_date() {
    let h = harness();
    let mut req = request("studio", date(2026, 6, 10), date(2026, 6, 13));
    req.promo_code = Some("summer".to_string());
    req.booked_on = Some(date(2026, 7, 1));

    let quote = h.pricer.quote(&req).unwrap();
    assert_eq!(quote.price.promo_discount_amount, Decimal::from(30));

    // Settles even once the promo window has passed on the wall clock.
    h.pricer.settle("guest-42", &quote).unwrap();
    assert_eq!(h.promos.get("SUMMER").unwrap().current_uses, 1);
}

#[test]
fn test_invalid_stay_is_rejected_before_loyalty() {
    let h = harness();
    let req = request("studio", date(2026, 6, 3), date(2026, 6, 3));
    let err = h.pricer.quote(&req).unwrap_err();
    assert!(matches!(err, OrbiError::InvalidRange { .. }));
    assert!(h.store.is_empty());
}

#[test]
fn test_quote_serializes_for_booking_record() {
    let h = harness();
    let quote = h
        .pricer
        .quote(&request("studio", date(2026, 6, 1), date(2026, 6, 2)))
        .unwrap();
    let json = serde_json::to_value(quote.amounts()).unwrap();
    assert_eq!(json["total_price"], serde_json::json!(95.0));
    assert_eq!(json["discount_amount"], serde_json::json!(5.0));
}

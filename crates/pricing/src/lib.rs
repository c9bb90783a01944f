//! Booking price computation for Orbi City: nightly rates with seasonal
//! overrides, stay aggregation, and discount stacking.

pub mod booking;
pub mod rates;
pub mod resolver;
pub mod stay;

pub use booking::{BookingPricer, BookingQuote, BookingQuoteRequest};
pub use rates::rate_for_date;
pub use resolver::{resolve_booking_price, DiscountRequest, DiscountResolver};
pub use stay::price_stay;

//! Loyalty program for Orbi City bookings: lifetime-earned tiers, point
//! accrual on the payable amount, and capped points redemption.

pub mod engine;
pub mod ledger;
pub mod redemption;

pub use engine::LoyaltyEngine;
pub use ledger::LoyaltyLedger;
pub use redemption::RedemptionCalculator;

//! Promo codes configured in the admin back-office.
//!
//! Production validation runs server-side in the data store; `PromoCatalog`
//! applies the same checks in-process for development and tests.

use chrono::NaiveDate;
use dashmap::DashMap;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{OrbiError, OrbiResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PromoDiscountKind {
    /// Whole percent of the base price.
    Percentage(u32),
    /// Flat currency amount.
    Fixed(Decimal),
}

/// A `promo_codes` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoCode {
    pub code: String,
    pub discount: PromoDiscountKind,
    #[serde(default)]
    pub valid_from: Option<NaiveDate>,
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
    #[serde(default)]
    pub max_uses: Option<u32>,
    #[serde(default)]
    pub current_uses: u32,
    #[serde(default)]
    pub min_nights: Option<u32>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// What the validator needs to know about the booking. A quote keeps the
/// context it was validated with so settlement checks the same booking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromoContext {
    pub today: NaiveDate,
    pub nights: u32,
}

/// A validated promo, ready to apply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromoDiscount {
    pub code: String,
    pub kind: PromoDiscountKind,
}

impl PromoDiscount {
    /// Currency discount against `base`, never more than `base`.
    pub fn amount_for(&self, base: Decimal) -> Decimal {
        if base <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let amount = match self.kind {
            PromoDiscountKind::Percentage(pct) => (base * Decimal::from(pct.min(100))
                / Decimal::ONE_HUNDRED)
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero),
            PromoDiscountKind::Fixed(amount) => amount.max(Decimal::ZERO),
        };
        amount.min(base)
    }
}

impl PromoCode {
    /// Check the row against the booking. Returns the rejection reason on failure.
    pub fn check(&self, ctx: &PromoContext) -> Result<(), String> {
        if !self.is_active {
            return Err(format!("{} is not active", self.code));
        }
        if self.valid_from.is_some_and(|from| ctx.today < from) {
            return Err(format!("{} is not valid yet", self.code));
        }
        if self.valid_until.is_some_and(|until| ctx.today > until) {
            return Err(format!("{} has expired", self.code));
        }
        if self.max_uses.is_some_and(|max| self.current_uses >= max) {
            return Err(format!("{} has no uses left", self.code));
        }
        if let Some(min) = self.min_nights {
            if ctx.nights < min {
                return Err(format!("{} requires at least {} nights", self.code, min));
            }
        }
        Ok(())
    }
}

/// Validates promo code strings. The production implementation calls the
/// data store's stored function.
pub trait PromoValidator: Send + Sync {
    fn validate(&self, code: &str, ctx: &PromoContext) -> OrbiResult<PromoDiscount>;

    /// Re-check the code against `ctx` and count one use.
    fn record_use(&self, code: &str, ctx: &PromoContext) -> OrbiResult<()>;

    /// Give back a use taken by `record_use` when the booking did not commit.
    fn release_use(&self, code: &str) -> OrbiResult<()>;
}

/// In-memory promo catalog keyed by upper-cased code.
#[derive(Default)]
pub struct PromoCatalog {
    codes: DashMap<String, PromoCode>,
}

impl PromoCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_codes(codes: impl IntoIterator<Item = PromoCode>) -> Self {
        let catalog = Self::new();
        for code in codes {
            catalog.upsert(code);
        }
        catalog
    }

    pub fn upsert(&self, code: PromoCode) {
        self.codes.insert(normalize(&code.code), code);
    }

    pub fn get(&self, code: &str) -> Option<PromoCode> {
        self.codes.get(&normalize(code)).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

fn normalize(code: &str) -> String {
    code.trim().to_uppercase()
}

impl PromoValidator for PromoCatalog {
    fn validate(&self, code: &str, ctx: &PromoContext) -> OrbiResult<PromoDiscount> {
        let entry = self
            .codes
            .get(&normalize(code))
            .ok_or_else(|| OrbiError::InvalidPromo(format!("unknown code {}", code.trim())))?;
        entry.check(ctx).map_err(OrbiError::InvalidPromo)?;
        debug!(code = %entry.code, kind = ?entry.discount, "Promo code accepted");
        Ok(PromoDiscount {
            code: entry.code.clone(),
            kind: entry.discount,
        })
    }

    fn record_use(&self, code: &str, ctx: &PromoContext) -> OrbiResult<()> {
        let mut entry = self
            .codes
            .get_mut(&normalize(code))
            .ok_or_else(|| OrbiError::InvalidPromo(format!("unknown code {}", code.trim())))?;
        entry.check(ctx).map_err(OrbiError::InvalidPromo)?;
        entry.current_uses += 1;
        info!(code = %entry.code, uses = entry.current_uses, "Promo code used");
        Ok(())
    }

    fn release_use(&self, code: &str) -> OrbiResult<()> {
        let mut entry = self
            .codes
            .get_mut(&normalize(code))
            .ok_or_else(|| OrbiError::InvalidPromo(format!("unknown code {}", code.trim())))?;
        entry.current_uses = entry.current_uses.saturating_sub(1);
        info!(code = %entry.code, uses = entry.current_uses, "Promo code use released");
        Ok(())
    }
}

//! Loyalty program domain types — points ledger with lifetime-earned tiers.
//!
//! - Four tiers: Bronze → Silver → Gold → Platinum, derived from lifetime earnings
//! - Each tier grants a percentage discount on the stay price
//! - Points earned on the payable amount, redeemed as a currency discount

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ─── Tier System ────────────────────────────────────────────────────────────

/// Loyalty tier levels, ordered by lifetime points earned.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LoyaltyTier {
    /// Entry level, [0, 500).
    #[default]
    Bronze,
    /// [500, 1500).
    Silver,
    /// [1500, 3000).
    Gold,
    /// 3000 and above.
    Platinum,
}

impl LoyaltyTier {
    pub fn next(&self) -> Option<LoyaltyTier> {
        match self {
            LoyaltyTier::Bronze => Some(LoyaltyTier::Silver),
            LoyaltyTier::Silver => Some(LoyaltyTier::Gold),
            LoyaltyTier::Gold => Some(LoyaltyTier::Platinum),
            LoyaltyTier::Platinum => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoyaltyTier::Bronze => "bronze",
            LoyaltyTier::Silver => "silver",
            LoyaltyTier::Gold => "gold",
            LoyaltyTier::Platinum => "platinum",
        }
    }
}

/// Tier plus the discount it grants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TierStatus {
    pub tier: LoyaltyTier,
    pub discount_percent: u32,
}

// ─── Account ────────────────────────────────────────────────────────────────

/// One ledger row per user. `points == total_earned - total_redeemed` holds
/// across the account's history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoyaltyAccount {
    pub user_id: String,
    pub points: u64,
    pub total_earned: u64,
    pub total_redeemed: u64,
    pub tier: LoyaltyTier,
    /// Bumped by the store on every successful write.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LoyaltyAccount {
    /// A zeroed bronze account.
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            points: 0,
            total_earned: 0,
            total_redeemed: 0,
            tier: LoyaltyTier::Bronze,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_balanced(&self) -> bool {
        self.total_earned.checked_sub(self.total_redeemed) == Some(self.points)
    }
}

// ─── Earning & Redemption ───────────────────────────────────────────────────

/// Result of an accrual.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccrualReceipt {
    pub user_id: String,
    pub charged_amount: Decimal,
    pub points_added: u64,
    pub new_balance: u64,
    pub tier: LoyaltyTier,
    pub tier_changed: bool,
}

/// Result of a redemption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedemptionReceipt {
    pub user_id: String,
    pub points_redeemed: u64,
    pub discount_amount: Decimal,
    pub new_balance: u64,
}

/// Combined redemption + accrual committed for one booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementReceipt {
    pub redemption: Option<RedemptionReceipt>,
    pub accrual: AccrualReceipt,
    pub account: LoyaltyAccount,
}

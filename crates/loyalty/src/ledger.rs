//! Loyalty ledger service: applies engine transforms to stored accounts.
//!
//! Each operation is one read-modify-write committed by compare-and-swap on
//! the account version. A conflicting writer forces a re-read and a fresh
//! computation, so concurrent bookings never overwrite each other's points.

use std::sync::Arc;

use orbi_core::config::AppConfig;
use orbi_core::error::{OrbiError, OrbiResult};
use orbi_core::event_bus::{EventSink, LedgerEvent, LedgerEventType};
use orbi_core::loyalty::*;
use orbi_core::store::LoyaltyStore;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::engine::LoyaltyEngine;
use crate::redemption::RedemptionCalculator;

pub struct LoyaltyLedger {
    engine: LoyaltyEngine,
    redemption: RedemptionCalculator,
    store: Arc<dyn LoyaltyStore>,
    events: Arc<dyn EventSink>,
    auto_provision: bool,
    max_retries: u32,
}

impl LoyaltyLedger {
    pub fn new(config: &AppConfig, store: Arc<dyn LoyaltyStore>, events: Arc<dyn EventSink>) -> Self {
        Self {
            engine: LoyaltyEngine::new(&config.loyalty),
            redemption: RedemptionCalculator::new(&config.redemption),
            store,
            events,
            auto_provision: config.loyalty.auto_provision_accounts,
            max_retries: config.loyalty.max_write_retries,
        }
    }

    pub fn engine(&self) -> &LoyaltyEngine {
        &self.engine
    }

    pub fn redemption(&self) -> &RedemptionCalculator {
        &self.redemption
    }

    pub fn account(&self, user_id: &str) -> OrbiResult<Option<LoyaltyAccount>> {
        self.store.get(user_id)
    }

    /// Tier status for a user; users without an account are bronze.
    pub fn tier_status(&self, user_id: &str) -> OrbiResult<TierStatus> {
        let earned = self.store.get(user_id)?.map(|a| a.total_earned).unwrap_or(0);
        Ok(self.engine.tier_and_discount_for(earned))
    }

    /// Award points for a completed charge.
    pub fn accrue(&self, user_id: &str, charged_amount: Decimal) -> OrbiResult<AccrualReceipt> {
        let (account, receipt) = self.write(user_id, true, |current| {
            self.engine.accrue_points(current, charged_amount)
        })?;
        self.after_accrual(&account, &receipt);
        Ok(receipt)
    }

    /// Spend points. The caller has already clamped `points` to the cap.
    pub fn redeem(&self, user_id: &str, points: u64) -> OrbiResult<RedemptionReceipt> {
        let (account, receipt) = self.write(user_id, false, |current| {
            let updated = self.engine.redeem_points(current, points)?;
            let receipt = self.redemption_receipt(&updated, points);
            Ok((updated, receipt))
        })?;
        self.after_redemption(&account, &receipt);
        Ok(receipt)
    }

    /// Redeem `points_to_redeem` and accrue on `charged_amount` in a single
    /// write, as one booking.
    pub fn settle(
        &self,
        user_id: &str,
        points_to_redeem: u64,
        charged_amount: Decimal,
    ) -> OrbiResult<SettlementReceipt> {
        let (account, (redemption, accrual)) = self.write(user_id, true, |current| {
            let (after_redeem, redemption) = if points_to_redeem > 0 {
                let updated = self.engine.redeem_points(current, points_to_redeem)?;
                let receipt = self.redemption_receipt(&updated, points_to_redeem);
                (updated, Some(receipt))
            } else {
                (current.clone(), None)
            };
            let (updated, accrual) = self.engine.accrue_points(&after_redeem, charged_amount)?;
            Ok((updated, (redemption, accrual)))
        })?;

        if let Some(redemption) = &redemption {
            self.after_redemption(&account, redemption);
        }
        self.after_accrual(&account, &accrual);

        Ok(SettlementReceipt {
            redemption,
            accrual,
            account,
        })
    }

    fn redemption_receipt(&self, updated: &LoyaltyAccount, points: u64) -> RedemptionReceipt {
        RedemptionReceipt {
            user_id: updated.user_id.clone(),
            points_redeemed: points,
            discount_amount: self.redemption.discount_for_points(points),
            new_balance: updated.points,
        }
    }

    fn load(&self, user_id: &str, provision: bool) -> OrbiResult<LoyaltyAccount> {
        if let Some(account) = self.store.get(user_id)? {
            return Ok(account);
        }
        if !(provision && self.auto_provision) {
            return Err(OrbiError::NoAccount(user_id.to_string()));
        }
        let (account, inserted) = self.store.insert_if_absent(LoyaltyAccount::new(user_id))?;
        if inserted {
            info!(user_id, "Loyalty account provisioned");
            self.events.emit(LedgerEvent::new(
                LedgerEventType::AccountProvisioned,
                Some(user_id.to_string()),
            ));
        }
        Ok(account)
    }

    /// Read, transform, compare-and-swap; retry on conflict.
    fn write<T>(
        &self,
        user_id: &str,
        provision: bool,
        op: impl Fn(&LoyaltyAccount) -> OrbiResult<(LoyaltyAccount, T)>,
    ) -> OrbiResult<(LoyaltyAccount, T)> {
        let mut attempt = 0;
        loop {
            let current = self.load(user_id, provision)?;
            let (updated, output) = op(&current)?;
            match self.store.compare_and_swap(updated) {
                Ok(stored) => return Ok((stored, output)),
                Err(OrbiError::Conflict(reason)) => {
                    metrics::counter!("loyalty.cas_conflicts").increment(1);
                    attempt += 1;
                    if attempt > self.max_retries {
                        warn!(user_id, attempts = attempt, "Loyalty write retries exhausted");
                        return Err(OrbiError::Conflict(reason));
                    }
                    warn!(user_id, attempt, %reason, "Loyalty write conflict, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn after_accrual(&self, account: &LoyaltyAccount, receipt: &AccrualReceipt) {
        metrics::counter!("loyalty.points_earned").increment(receipt.points_added);
        self.events.emit(
            LedgerEvent::new(LedgerEventType::PointsEarned, Some(account.user_id.clone()))
                .with_points(receipt.points_added)
                .with_amount(receipt.charged_amount),
        );
        if receipt.tier_changed {
            metrics::counter!("loyalty.tier_upgrades").increment(1);
            info!(user_id = %account.user_id, tier = account.tier.as_str(), "Tier upgrade");
            self.events.emit(
                LedgerEvent::new(LedgerEventType::TierUpgrade, Some(account.user_id.clone()))
                    .with_tier(account.tier),
            );
        }
    }

    fn after_redemption(&self, account: &LoyaltyAccount, receipt: &RedemptionReceipt) {
        metrics::counter!("loyalty.points_redeemed").increment(receipt.points_redeemed);
        info!(
            user_id = %account.user_id,
            points = receipt.points_redeemed,
            discount = %receipt.discount_amount,
            new_balance = receipt.new_balance,
            "Points redeemed"
        );
        self.events.emit(
            LedgerEvent::new(LedgerEventType::PointsRedeemed, Some(account.user_id.clone()))
                .with_points(receipt.points_redeemed)
                .with_amount(receipt.discount_amount),
        );
    }
}

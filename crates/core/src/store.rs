//! Data-store seams for rate tables and loyalty accounts.
//!
//! The hosted database is the production backend; the in-memory types here
//! provide the same API surface for development and testing.

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{OrbiError, OrbiResult};
use crate::loyalty::LoyaltyAccount;
use crate::promo::PromoCode;
use crate::types::{ApartmentRate, SeasonalOverride};

// ─── Rates ──────────────────────────────────────────────────────────────────

/// Source of apartment base rates and seasonal overrides.
pub trait RateSource: Send + Sync {
    fn apartment_rates(&self) -> OrbiResult<Vec<ApartmentRate>>;

    /// Overrides for one calendar year, in store order.
    fn seasonal_overrides(&self, year: i32, active_only: bool) -> OrbiResult<Vec<SeasonalOverride>>;
}

/// Static rate catalog, typically loaded from a JSON export of the rate tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateCatalog {
    #[serde(default)]
    pub apartments: Vec<ApartmentRate>,
    #[serde(default)]
    pub seasonal_overrides: Vec<SeasonalOverride>,
    #[serde(default)]
    pub promo_codes: Vec<PromoCode>,
}

impl RateCatalog {
    pub fn from_json(json: &str) -> OrbiResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<std::path::Path>) -> OrbiResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }
}

impl RateSource for RateCatalog {
    fn apartment_rates(&self) -> OrbiResult<Vec<ApartmentRate>> {
        Ok(self.apartments.clone())
    }

    fn seasonal_overrides(&self, year: i32, active_only: bool) -> OrbiResult<Vec<SeasonalOverride>> {
        Ok(self
            .seasonal_overrides
            .iter()
            .filter(|o| o.year == year && (o.is_active || !active_only))
            .cloned()
            .collect())
    }
}

// ─── Loyalty Accounts ───────────────────────────────────────────────────────

/// Persistence for loyalty accounts. Writes are compare-and-swap on
/// `LoyaltyAccount::version`; callers never blind-write a row they read.
pub trait LoyaltyStore: Send + Sync {
    fn get(&self, user_id: &str) -> OrbiResult<Option<LoyaltyAccount>>;

    /// Insert `account` unless a row already exists. Returns the stored row
    /// and whether this call created it.
    fn insert_if_absent(&self, account: LoyaltyAccount) -> OrbiResult<(LoyaltyAccount, bool)>;

    /// Replace the row if its version still equals `account.version`. The
    /// stored (and returned) row carries the next version. Fails with
    /// `Conflict` when another writer got there first.
    fn compare_and_swap(&self, account: LoyaltyAccount) -> OrbiResult<LoyaltyAccount>;
}

/// Thread-safe in-memory loyalty store backed by DashMap.
#[derive(Default)]
pub struct InMemoryLoyaltyStore {
    accounts: DashMap<String, LoyaltyAccount>,
}

impl InMemoryLoyaltyStore {
    pub fn new() -> Self {
        info!("Loyalty store initialized (in-memory, development mode)");
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl LoyaltyStore for InMemoryLoyaltyStore {
    fn get(&self, user_id: &str) -> OrbiResult<Option<LoyaltyAccount>> {
        Ok(self.accounts.get(user_id).map(|r| r.value().clone()))
    }

    fn insert_if_absent(&self, account: LoyaltyAccount) -> OrbiResult<(LoyaltyAccount, bool)> {
        match self.accounts.entry(account.user_id.clone()) {
            Entry::Occupied(entry) => Ok((entry.get().clone(), false)),
            Entry::Vacant(entry) => {
                entry.insert(account.clone());
                Ok((account, true))
            }
        }
    }

    fn compare_and_swap(&self, mut account: LoyaltyAccount) -> OrbiResult<LoyaltyAccount> {
        match self.accounts.entry(account.user_id.clone()) {
            Entry::Occupied(mut entry) => {
                let current = entry.get().version;
                if current != account.version {
                    return Err(OrbiError::Conflict(format!(
                        "account {} at version {}, write expected {}",
                        account.user_id, current, account.version
                    )));
                }
                account.version += 1;
                account.updated_at = Utc::now();
                entry.insert(account.clone());
                Ok(account)
            }
            Entry::Vacant(_) => Err(OrbiError::NoAccount(account.user_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_cas_bumps_version() {
        let store = InMemoryLoyaltyStore::new();
        let (account, inserted) = store.insert_if_absent(LoyaltyAccount::new("u1")).unwrap();
        assert!(inserted);
        assert_eq!(account.version, 0);

        let mut update = account.clone();
        update.points = 10;
        update.total_earned = 10;
        let stored = store.compare_and_swap(update).unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(store.get("u1").unwrap().unwrap().points, 10);
    }

    #[test]
    fn test_cas_rejects_stale_version() {
        let store = InMemoryLoyaltyStore::new();
        let (account, _) = store.insert_if_absent(LoyaltyAccount::new("u1")).unwrap();
        store.compare_and_swap(account.clone()).unwrap();

        let err = store.compare_and_swap(account).unwrap_err();
        assert!(matches!(err, OrbiError::Conflict(_)));
    }

    #[test]
    fn test_cas_on_missing_row() {
        let store = InMemoryLoyaltyStore::new();
        let err = store.compare_and_swap(LoyaltyAccount::new("ghost")).unwrap_err();
        assert!(matches!(err, OrbiError::NoAccount(_)));
    }

    #[test]
    fn test_insert_if_absent_keeps_existing() {
        let store = InMemoryLoyaltyStore::new();
        let mut first = LoyaltyAccount::new("u1");
        first.points = 40;
        first.total_earned = 40;
        store.insert_if_absent(first).unwrap();
        let (second, inserted) = store.insert_if_absent(LoyaltyAccount::new("u1")).unwrap();
        assert!(!inserted);
        assert_eq!(second.points, 40);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_catalog_filters_overrides_by_year() {
        let catalog = RateCatalog::from_json(
            r#"{
                "apartments": [{"apartment_type": "studio", "price_per_night": 120, "max_guests": 2}],
                "seasonal_overrides": [
                    {"apartment_type": "studio", "month": 7, "year": 2026, "price_per_night": 180},
                    {"apartment_type": "studio", "month": 8, "year": 2026, "price_per_night": 190, "is_active": false},
                    {"apartment_type": "studio", "month": 7, "year": 2027, "price_per_night": 200}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(catalog.apartment_rates().unwrap()[0].price_per_night, Decimal::from(120));
        assert_eq!(catalog.seasonal_overrides(2026, true).unwrap().len(), 1);
        assert_eq!(catalog.seasonal_overrides(2026, false).unwrap().len(), 2);
        assert_eq!(catalog.seasonal_overrides(2027, true).unwrap().len(), 1);
    }
}

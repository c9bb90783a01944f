use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `ORBI_CITY__` and an optional TOML config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub loyalty: LoyaltyConfig,
    #[serde(default)]
    pub redemption: RedemptionConfig,
}

// ─── Loyalty Config ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct LoyaltyConfig {
    /// Lifetime points needed for silver.
    #[serde(default = "default_silver_threshold")]
    pub silver_threshold: u64,
    #[serde(default = "default_gold_threshold")]
    pub gold_threshold: u64,
    #[serde(default = "default_platinum_threshold")]
    pub platinum_threshold: u64,
    #[serde(default = "default_bronze_discount")]
    pub bronze_discount_percent: u32,
    #[serde(default = "default_silver_discount")]
    pub silver_discount_percent: u32,
    #[serde(default = "default_gold_discount")]
    pub gold_discount_percent: u32,
    #[serde(default = "default_platinum_discount")]
    pub platinum_discount_percent: u32,
    /// Currency units charged per point earned.
    #[serde(default = "default_currency_units_per_point")]
    pub currency_units_per_point: u32,
    /// Create a zeroed account on first accrual instead of failing.
    #[serde(default = "default_auto_provision")]
    pub auto_provision_accounts: bool,
    #[serde(default = "default_max_write_retries")]
    pub max_write_retries: u32,
}

fn default_silver_threshold() -> u64 { 500 }
fn default_gold_threshold() -> u64 { 1500 }
fn default_platinum_threshold() -> u64 { 3000 }
fn default_bronze_discount() -> u32 { 5 }
fn default_silver_discount() -> u32 { 10 }
fn default_gold_discount() -> u32 { 15 }
fn default_platinum_discount() -> u32 { 20 }
fn default_currency_units_per_point() -> u32 { 10 }
fn default_auto_provision() -> bool { true }
fn default_max_write_retries() -> u32 { 8 }

impl Default for LoyaltyConfig {
    fn default() -> Self {
        Self {
            silver_threshold: default_silver_threshold(),
            gold_threshold: default_gold_threshold(),
            platinum_threshold: default_platinum_threshold(),
            bronze_discount_percent: default_bronze_discount(),
            silver_discount_percent: default_silver_discount(),
            gold_discount_percent: default_gold_discount(),
            platinum_discount_percent: default_platinum_discount(),
            currency_units_per_point: default_currency_units_per_point(),
            auto_provision_accounts: default_auto_provision(),
            max_write_retries: default_max_write_retries(),
        }
    }
}

// ─── Redemption Config ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct RedemptionConfig {
    #[serde(default = "default_points_per_currency_unit")]
    pub points_per_currency_unit: u32,
    /// Largest share of the order subtotal points may cover, in percent.
    #[serde(default = "default_max_redeem_percent")]
    pub max_redeem_percent: u32,
    #[serde(default = "default_redeem_step")]
    pub redeem_step: u64,
    /// Reject over-cap requests instead of clamping them.
    #[serde(default)]
    pub strict_cap: bool,
}

fn default_points_per_currency_unit() -> u32 { 10 }
fn default_max_redeem_percent() -> u32 { 50 }
fn default_redeem_step() -> u64 { 10 }

impl Default for RedemptionConfig {
    fn default() -> Self {
        Self {
            points_per_currency_unit: default_points_per_currency_unit(),
            max_redeem_percent: default_max_redeem_percent(),
            redeem_step: default_redeem_step(),
            strict_cap: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and an optional config file.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("ORBI_CITY")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let config: AppConfig = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make the tier table or the redemption
    /// arithmetic meaningless.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        let l = &self.loyalty;
        if !(l.silver_threshold < l.gold_threshold && l.gold_threshold < l.platinum_threshold) {
            return Err(config::ConfigError::Message(
                "loyalty tier thresholds must be strictly increasing".to_string(),
            ));
        }
        if l.currency_units_per_point == 0 {
            return Err(config::ConfigError::Message(
                "loyalty.currency_units_per_point must be positive".to_string(),
            ));
        }
        let r = &self.redemption;
        if r.points_per_currency_unit == 0 || r.redeem_step == 0 {
            return Err(config::ConfigError::Message(
                "redemption rate and step must be positive".to_string(),
            ));
        }
        if r.max_redeem_percent > 100 {
            return Err(config::ConfigError::Message(
                "redemption.max_redeem_percent must be at most 100".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_tier_table() {
        let config = AppConfig::default();
        assert_eq!(config.loyalty.silver_threshold, 500);
        assert_eq!(config.loyalty.gold_threshold, 1500);
        assert_eq!(config.loyalty.platinum_threshold, 3000);
        assert_eq!(config.loyalty.gold_discount_percent, 15);
        assert_eq!(config.redemption.max_redeem_percent, 50);
        assert!(config.loyalty.auto_provision_accounts);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unordered_thresholds() {
        let mut config = AppConfig::default();
        config.loyalty.gold_threshold = 400;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_section_uses_field_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"redemption": {"strict_cap": true}}"#).unwrap();
        assert!(config.redemption.strict_cap);
        assert_eq!(config.redemption.redeem_step, 10);
        assert_eq!(config.loyalty.silver_discount_percent, 10);
    }
}

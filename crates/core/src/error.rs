use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

pub type OrbiResult<T> = Result<T, OrbiError>;

#[derive(Error, Debug)]
pub enum OrbiError {
    #[error("No base rate for apartment type: {0}")]
    NotFound(String),

    #[error("Invalid stay range: check-out {check_out} must be after check-in {check_in}")]
    InvalidRange {
        check_in: NaiveDate,
        check_out: NaiveDate,
    },

    #[error("Invalid guest count {guests} for {apartment_type} (max {max_guests})")]
    InvalidGuests {
        apartment_type: String,
        guests: u32,
        max_guests: u32,
    },

    #[error("Invalid amount: {0}")]
    InvalidAmount(Decimal),

    #[error("No loyalty account for user: {0}")]
    NoAccount(String),

    #[error("Redemption of {requested} points exceeds the cap of {max} points")]
    CapExceeded { requested: u64, max: u64 },

    #[error("Insufficient points: need {requested}, have {available}")]
    InsufficientPoints { requested: u64, available: u64 },

    #[error("Promo code rejected: {0}")]
    InvalidPromo(String),

    #[error("Concurrent write conflict: {0}")]
    Conflict(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for OrbiError {
    fn from(err: config::ConfigError) -> Self {
        OrbiError::Config(err.to_string())
    }
}

impl OrbiError {
    /// Whether the caller can fix the request and try again (as opposed to a
    /// missing record or an infrastructure failure).
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            OrbiError::InvalidRange { .. }
                | OrbiError::InvalidGuests { .. }
                | OrbiError::InsufficientPoints { .. }
                | OrbiError::CapExceeded { .. }
                | OrbiError::InvalidPromo(_)
        )
    }
}

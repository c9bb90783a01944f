pub mod config;
pub mod error;
pub mod event_bus;
pub mod loyalty;
pub mod promo;
pub mod store;
pub mod types;

pub use config::AppConfig;
pub use error::{OrbiError, OrbiResult};

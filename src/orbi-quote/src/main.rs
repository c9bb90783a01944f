//! Orbi City quote tool — prices one stay against an exported rate catalog.
//!
//! Prints the booking quote as JSON on stdout; logs go to stderr.

use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::Parser;
use orbi_core::config::AppConfig;
use orbi_core::event_bus::noop_sink;
use orbi_core::loyalty::LoyaltyAccount;
use orbi_core::promo::PromoCatalog;
use orbi_core::store::{InMemoryLoyaltyStore, LoyaltyStore, RateCatalog};
use orbi_core::types::StayRequest;
use orbi_loyalty::LoyaltyLedger;
use orbi_pricing::{BookingPricer, BookingQuoteRequest};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "orbi-quote")]
#[command(about = "Price an Orbi City stay with seasonal rates, loyalty, and promo discounts")]
#[command(version)]
struct Cli {
    /// JSON rate catalog: apartments, seasonal_overrides, promo_codes
    #[arg(long, env = "ORBI_CITY__CATALOG")]
    catalog: String,

    /// Optional TOML config file (environment variables still apply)
    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    apartment: String,

    #[arg(long)]
    check_in: NaiveDate,

    #[arg(long)]
    check_out: NaiveDate,

    #[arg(long, default_value_t = 2)]
    guests: u32,

    /// Loyalty member id; omit for an anonymous quote
    #[arg(long)]
    user: Option<String>,

    /// Lifetime points earned by the member
    #[arg(long, default_value_t = 0)]
    total_earned: u64,

    /// Current redeemable balance (defaults to --total-earned)
    #[arg(long)]
    points_balance: Option<u64>,

    /// Points to redeem against this booking
    #[arg(long, default_value_t = 0)]
    redeem: u64,

    #[arg(long, default_value_t = false)]
    no_tier_discount: bool,

    #[arg(long)]
    promo: Option<String>,

    /// Reject redemptions above the cap instead of clamping them
    #[arg(long)]
    strict_cap: Option<bool>,

    /// Redemption cap as a percent of the payable amount
    #[arg(long)]
    max_redeem_percent: Option<u32>,
}

/// CLI flags win over file and environment settings.
fn apply_overrides(config: &mut AppConfig, cli: &Cli) {
    if let Some(strict) = cli.strict_cap {
        config.redemption.strict_cap = strict;
    }
    if let Some(percent) = cli.max_redeem_percent {
        config.redemption.max_redeem_percent = percent.min(100);
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "orbi_quote=info,orbi_pricing=info,orbi_loyalty=info".into()),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });
    apply_overrides(&mut config, &cli);

    let catalog = RateCatalog::from_path(&cli.catalog)
        .with_context(|| format!("reading rate catalog {}", cli.catalog))?;
    info!(
        apartments = catalog.apartments.len(),
        overrides = catalog.seasonal_overrides.len(),
        promo_codes = catalog.promo_codes.len(),
        "Rate catalog loaded"
    );

    let store = Arc::new(InMemoryLoyaltyStore::new());
    let events = noop_sink();
    let ledger = Arc::new(LoyaltyLedger::new(&config, store.clone(), events.clone()));

    if cli.user.is_none() && (cli.redeem > 0 || cli.total_earned > 0 || cli.points_balance.is_some()) {
        bail!("loyalty options require --user");
    }

    if let Some(user_id) = &cli.user {
        let points = cli.points_balance.unwrap_or(cli.total_earned);
        if points > cli.total_earned {
            bail!("--points-balance {} exceeds --total-earned {}", points, cli.total_earned);
        }
        let mut account = LoyaltyAccount::new(user_id.clone());
        account.total_earned = cli.total_earned;
        account.points = points;
        account.total_redeemed = cli.total_earned - points;
        account.tier = ledger.engine().tier_and_discount_for(cli.total_earned).tier;
        store.insert_if_absent(account)?;
    }

    let promos = Arc::new(PromoCatalog::with_codes(catalog.promo_codes.clone()));
    let pricer = BookingPricer::new(&config, Arc::new(catalog), ledger, promos, events);

    let request = BookingQuoteRequest {
        stay: StayRequest {
            apartment_type: cli.apartment,
            check_in: cli.check_in,
            check_out: cli.check_out,
            guests: cli.guests,
        },
        user_id: cli.user,
        points_to_redeem: cli.redeem,
        apply_tier_discount: !cli.no_tier_discount,
        apply_points_redemption: cli.redeem > 0,
        promo_code: cli.promo,
        booked_on: None,
    };

    let quote = match pricer.quote(&request) {
        Ok(quote) => quote,
        Err(e) if e.is_user_correctable() => {
            warn!(error = %e, "Quote request rejected");
            bail!("{e}");
        }
        Err(e) => return Err(anyhow::Error::new(e).context("pricing booking")),
    };
    info!(
        nights = quote.stay.nights,
        final_total = %quote.price.final_total,
        points_earned = quote.price.points_earned,
        "Quote ready"
    );

    println!("{}", serde_json::to_string_pretty(&quote)?);
    Ok(())
}

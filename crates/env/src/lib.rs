use std::{str::FromStr, sync::Arc, time::Duration};

use dotenv::dotenv;
use eyre::{eyre, Context, Error};
use log::info;
use model::{
    decimal::Decimal,
    payout::{PayoutConfig, PayoutSchedule},
};

const DEFAULT_API_BASE: &str = "https://api.stripe.com/v1";
const DEFAULT_GATEWAY: &str = "stripe";
const MAX_WINDOW_DAYS: u32 = 3660;

#[derive(Clone)]
pub struct Env(Arc<EnvInner>);

#[derive(Clone)]
pub struct EnvInner {
    mongo_url: String,
    gateway_secret_key: String,
    gateway_api_base: String,
    gateway_name: String,
    gateway_timeout: Duration,
    payout_config: PayoutConfig,
    payout_schedule: PayoutSchedule,
}

impl Env {
    pub fn mongo_url(&self) -> &str {
        &self.0.mongo_url
    }

    pub fn gateway_secret_key(&self) -> &str {
        &self.0.gateway_secret_key
    }

    pub fn gateway_api_base(&self) -> &str {
        &self.0.gateway_api_base
    }

    /// Gateway whose subscriptions are cancelled by the expiry scan.
    pub fn gateway_name(&self) -> &str {
        &self.0.gateway_name
    }

    pub fn gateway_timeout(&self) -> Duration {
        self.0.gateway_timeout
    }

    pub fn payout_config(&self) -> &PayoutConfig {
        &self.0.payout_config
    }

    pub fn payout_schedule(&self) -> PayoutSchedule {
        self.0.payout_schedule
    }

    pub fn load() -> Result<Env, Error> {
        if let Err(err) = dotenv() {
            info!("No .env file loaded: {}", err);
        }
        Env::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Env, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| lookup(name).ok_or_else(|| eyre!("{} is not set", name));

        let defaults = PayoutConfig::default();
        let schedule = PayoutSchedule::default();
        let payout_config = PayoutConfig {
            currency: lookup("PAYOUT_CURRENCY").unwrap_or(defaults.currency),
            instructor_share: parse_or(&lookup, "INSTRUCTOR_SHARE_PERCENT", defaults.instructor_share)?,
            gateway_fee: parse_or(&lookup, "GATEWAY_FEE_PERCENT", defaults.gateway_fee)?,
            window_days: parse_or(&lookup, "PAYOUT_WINDOW_DAYS", defaults.window_days)?,
        };
        check_percent("INSTRUCTOR_SHARE_PERCENT", payout_config.instructor_share)?;
        check_percent("GATEWAY_FEE_PERCENT", payout_config.gateway_fee)?;
        if !(1..=MAX_WINDOW_DAYS).contains(&payout_config.window_days) {
            return Err(eyre!("PAYOUT_WINDOW_DAYS must be within 1..={}", MAX_WINDOW_DAYS));
        }

        let payout_schedule = PayoutSchedule {
            day_of_month: parse_or(&lookup, "PAYOUT_DAY_OF_MONTH", schedule.day_of_month)?,
            hour: parse_or(&lookup, "PAYOUT_HOUR", schedule.hour)?,
        };
        if !(1..=31).contains(&payout_schedule.day_of_month) {
            return Err(eyre!("PAYOUT_DAY_OF_MONTH must be within 1..=31"));
        }
        if payout_schedule.hour > 23 {
            return Err(eyre!("PAYOUT_HOUR must be within 0..=23"));
        }

        let gateway_timeout = parse_or(&lookup, "GATEWAY_TIMEOUT_SECS", 30u64)?;
        if gateway_timeout == 0 {
            return Err(eyre!("GATEWAY_TIMEOUT_SECS must be positive"));
        }

        Ok(Env(Arc::new(EnvInner {
            mongo_url: required("MONGO_URL")?,
            gateway_secret_key: required("GATEWAY_SECRET_KEY")?,
            gateway_api_base: lookup("GATEWAY_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_owned()),
            gateway_name: lookup("GATEWAY_NAME").unwrap_or_else(|| DEFAULT_GATEWAY.to_owned()),
            gateway_timeout: Duration::from_secs(gateway_timeout),
            payout_config,
            payout_schedule,
        })))
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> Result<T, Error>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{} has invalid value: {}", name, value)),
        None => Ok(default),
    }
}

fn check_percent(name: &str, value: Decimal) -> Result<(), Error> {
    if value.is_negative() || value > Decimal::int(100) {
        return Err(eyre!("{} must be within 0..=100, got {}", name, value));
    }
    Ok(())
}

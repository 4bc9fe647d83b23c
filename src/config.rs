//! Runtime configuration read from the environment (and `.env` via dotenvy).

use rust_decimal::Decimal;
use std::time::Duration;

use crate::models::trip::{DEFAULT_CURRENCY, DEFAULT_MARGIN_PCT};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Currency applied to trips and items with none set
    pub default_currency: String,
    /// Margin applied to trips with no (or a zero) margin set
    pub default_margin_pct: Decimal,
    /// How long a loaded trip stays in the pricing cache
    pub trip_cache_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable lookup (the process environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let port = parse_or(&lookup, "PORT", 3000u16)?;
        let default_margin_pct = parse_or(&lookup, "DEFAULT_MARGIN_PCT", DEFAULT_MARGIN_PCT)?;
        let ttl_secs = parse_or(&lookup, "TRIP_CACHE_TTL_SECS", 300u64)?;

        Ok(Self {
            database_url,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            default_currency: lookup("DEFAULT_CURRENCY")
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            default_margin_pct,
            trip_cache_ttl: Duration::from_secs(ttl_secs),
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use access_core::TRIAL_LENGTH_DAYS;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub flag_store_path: PathBuf,
    pub auth_base_url: String,
    pub payment_base_url: String,
    pub trial_length_days: u32,
    pub transport_timeout: Duration,
    pub transport_max_retries: u32,
    pub entitlement_tick: Duration,
    pub cors_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server Settings ---
        let bind_address = parse_or(&lookup, "BIND_ADDRESS", "0.0.0.0:3000".parse::<SocketAddr>())?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin =
            lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        // --- Persistence ---
        let flag_store_path = lookup("FLAG_STORE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data/flags.json"));

        // --- Transports ---
        let auth_base_url = required(&lookup, "AUTH_BASE_URL")?;
        let payment_base_url = required(&lookup, "PAYMENT_BASE_URL")?;
        let timeout_secs: u64 = parse_or(&lookup, "TRANSPORT_TIMEOUT_SECS", Ok(10))?;
        let transport_max_retries = parse_or(&lookup, "TRANSPORT_MAX_RETRIES", Ok(2))?;

        // --- Entitlement ---
        let trial_length_days = parse_or(&lookup, "TRIAL_LENGTH_DAYS", Ok(TRIAL_LENGTH_DAYS))?;
        let tick_secs: u64 = parse_or(&lookup, "ENTITLEMENT_TICK_SECS", Ok(60))?;
        if tick_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "ENTITLEMENT_TICK_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            bind_address,
            log_level,
            flag_store_path,
            auth_base_url: auth_base_url.trim_end_matches('/').to_string(),
            payment_base_url: payment_base_url.trim_end_matches('/').to_string(),
            trial_length_days,
            transport_timeout: Duration::from_secs(timeout_secs),
            transport_max_retries,
            entitlement_tick: Duration::from_secs(tick_secs),
            cors_origin,
        })
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingVar(key.to_string()))
}

fn parse_or<F, T>(
    lookup: &F,
    key: &str,
    default: Result<T, <T as FromStr>::Err>,
) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let parsed = match lookup(key) {
        Some(raw) => raw.trim().parse::<T>(),
        None => default,
    };
    parsed.map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}

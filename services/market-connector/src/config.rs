//! Connector configuration
//!
//! Defaults match the public Upstox endpoints; every field can be overridden
//! through `UPSTOX_*` environment variables (a `.env` file is honoured).

use std::path::PathBuf;
use std::time::Duration;

use crate::instruments::{Exchange, RefreshPolicy};

/// Complete instrument dataset published by Upstox
pub const DEFAULT_INSTRUMENTS_URL: &str =
    "https://assets.upstox.com/market-quote/instruments/exchange/complete.csv.gz";

/// Upstox REST API base
pub const DEFAULT_API_BASE_URL: &str = "https://api.upstox.com";

const DEFAULT_INSTRUMENTS_FILE: &str = "instruments.csv";
const DEFAULT_ENV_FILE: &str = ".env";
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 120;
const DEFAULT_QUOTE_TIMEOUT_SECS: u64 = 10;
const SECS_PER_HOUR: u64 = 3600;

/// Market connector configuration
#[derive(Debug, Clone)]
pub struct MarketConnectorConfig {
    /// Remote gzip CSV with every tradable instrument
    pub instruments_url: String,

    /// Local filtered copy of the dataset
    pub instruments_file: PathBuf,

    /// Exchange used when a symbol lookup names none
    pub default_exchange: String,

    /// Upstox REST API base URL
    pub api_base_url: String,

    /// Env file the access token is persisted to
    pub env_file: PathBuf,

    /// Upper bound for the dataset download
    pub fetch_timeout: Duration,

    /// Upper bound for a single quote request
    pub quote_timeout: Duration,

    /// When the local dataset is considered stale
    pub refresh_policy: RefreshPolicy,
}

impl Default for MarketConnectorConfig {
    fn default() -> Self {
        Self {
            instruments_url: DEFAULT_INSTRUMENTS_URL.to_string(),
            instruments_file: PathBuf::from(DEFAULT_INSTRUMENTS_FILE),
            default_exchange: Exchange::NseEq.as_str().to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            env_file: PathBuf::from(DEFAULT_ENV_FILE),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            quote_timeout: Duration::from_secs(DEFAULT_QUOTE_TIMEOUT_SECS),
            refresh_policy: RefreshPolicy::Manual,
        }
    }
}

impl MarketConnectorConfig {
    /// Build configuration from the process environment.
    ///
    /// Loads `.env` (or `UPSTOX_ENV_FILE`) first; unset or unparsable values
    /// fall back to defaults.
    pub fn from_env() -> Self {
        let env_file = std::env::var("UPSTOX_ENV_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_ENV_FILE));
        dotenv::from_path(&env_file).ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let secs = |key: &str| text(key).and_then(|v| v.parse::<u64>().ok());

        let refresh_policy = secs("UPSTOX_INSTRUMENTS_MAX_AGE_HOURS")
            .filter(|hours| *hours > 0)
            .map_or(RefreshPolicy::Manual, |hours| {
                RefreshPolicy::MaxAge(Duration::from_secs(hours * SECS_PER_HOUR))
            });

        Self {
            instruments_url: text("UPSTOX_INSTRUMENTS_URL").unwrap_or(defaults.instruments_url),
            instruments_file: text("UPSTOX_INSTRUMENTS_FILE")
                .map_or(defaults.instruments_file, PathBuf::from),
            default_exchange: text("UPSTOX_DEFAULT_EXCHANGE")
                .map_or(defaults.default_exchange, |v| v.to_uppercase()),
            api_base_url: text("UPSTOX_API_BASE_URL").unwrap_or(defaults.api_base_url),
            env_file: text("UPSTOX_ENV_FILE").map_or(defaults.env_file, PathBuf::from),
            fetch_timeout: secs("UPSTOX_FETCH_TIMEOUT_SECS")
                .map_or(defaults.fetch_timeout, Duration::from_secs),
            quote_timeout: secs("UPSTOX_QUOTE_TIMEOUT_SECS")
                .map_or(defaults.quote_timeout, Duration::from_secs),
            refresh_policy,
        }
    }

    /// Override the env file path
    pub fn with_env_file(mut self, env_file: impl Into<PathBuf>) -> Self {
        self.env_file = env_file.into();
        self
    }
}

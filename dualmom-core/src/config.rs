//! Application configuration.
//!
//! One immutable `AppConfig` is built at startup and handed by reference to
//! every component. Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. An optional TOML file (`[strategy]`, `[fetch]`, `[cache]`, `[telegram]`)
//! 3. Environment variables `BOT_TOKEN` / `CHAT_ID` for delivery credentials
//!
//! Missing credentials disable delivery; they never block computation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the Telegram bot token.
pub const BOT_TOKEN_VAR: &str = "BOT_TOKEN";
/// Environment variable holding the Telegram chat id.
pub const CHAT_ID_VAR: &str = "CHAT_ID";

/// Ceiling for every pause and jitter setting, in seconds.
pub const MAX_PAUSE_SECS: f64 = 3600.0;
/// Ceiling for HTTP request timeouts, in seconds.
pub const MAX_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Complete configuration for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub strategy: StrategySettings,
    pub fetch: FetchSettings,
    pub cache: CacheSettings,
    pub telegram: TelegramSettings,
}

impl AppConfig {
    /// Load defaults, overlay the TOML file if given, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        let config = config.with_env_credentials();
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file. Does not read the environment.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string. Does not read the environment.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Fill delivery credentials from `BOT_TOKEN` / `CHAT_ID`.
    ///
    /// Environment values take precedence over the file; empty values count
    /// as unset.
    pub fn with_env_credentials(mut self) -> Self {
        if let Some(token) = non_empty_env(BOT_TOKEN_VAR) {
            self.telegram.bot_token = Some(token);
        }
        if let Some(chat_id) = non_empty_env(CHAT_ID_VAR) {
            self.telegram.chat_id = Some(chat_id);
        }
        self
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.strategy;
        if s.symbols.is_empty() {
            return Err(ConfigError::Invalid("strategy.symbols is empty".into()));
        }
        let mut seen = std::collections::HashSet::new();
        if let Some(dup) = s.symbols.iter().find(|sym| !seen.insert(sym.as_str())) {
            return Err(ConfigError::Invalid(format!(
                "'{dup}' is listed twice in strategy.symbols"
            )));
        }
        if s.risk_assets.is_empty() {
            return Err(ConfigError::Invalid("strategy.risk_assets is empty".into()));
        }
        for asset in s.risk_assets.iter().chain(std::iter::once(&s.safe_asset)) {
            if !s.symbols.contains(asset) {
                return Err(ConfigError::Invalid(format!(
                    "'{asset}' is not listed in strategy.symbols"
                )));
            }
        }
        if s.risk_assets.contains(&s.safe_asset) {
            return Err(ConfigError::Invalid(format!(
                "'{}' cannot be both a risk asset and the safe asset",
                s.safe_asset
            )));
        }
        if s.horizons.is_empty() || s.horizons.contains(&0) {
            return Err(ConfigError::Invalid(
                "strategy.horizons must be non-empty and positive".into(),
            ));
        }
        if s.years_back == 0 {
            return Err(ConfigError::Invalid("strategy.years_back must be >= 1".into()));
        }

        let f = &self.fetch;
        if f.max_retries == 0 {
            return Err(ConfigError::Invalid("fetch.max_retries must be >= 1".into()));
        }
        if f.chart_hosts.is_empty() {
            return Err(ConfigError::Invalid("fetch.chart_hosts is empty".into()));
        }
        if f.trailing_window_days == 0 {
            return Err(ConfigError::Invalid(
                "fetch.trailing_window_days must be >= 1".into(),
            ));
        }
        let timeouts = [
            ("fetch.request_timeout_secs", f.request_timeout_secs),
            ("telegram.timeout_secs", self.telegram.timeout_secs),
        ];
        for (name, value) in timeouts {
            if !(1..=MAX_TIMEOUT_SECS).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be between 1 and {MAX_TIMEOUT_SECS}"
                )));
            }
        }
        let pauses = [
            ("fetch.base_sleep_secs", f.base_sleep_secs),
            ("fetch.max_jitter_secs", f.max_jitter_secs),
            ("fetch.symbol_delay_min_secs", f.symbol_delay_min_secs),
            ("fetch.symbol_delay_max_secs", f.symbol_delay_max_secs),
        ];
        for (name, value) in pauses {
            // also keeps Duration::from_secs_f64 in range
            if !(0.0..=MAX_PAUSE_SECS).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be between 0 and {MAX_PAUSE_SECS}"
                )));
            }
        }
        if f.symbol_delay_min_secs > f.symbol_delay_max_secs {
            return Err(ConfigError::Invalid(
                "fetch.symbol_delay_min_secs exceeds symbol_delay_max_secs".into(),
            ));
        }

        if self.cache.staleness_tolerance_days < 0 {
            return Err(ConfigError::Invalid(
                "cache.staleness_tolerance_days must be >= 0".into(),
            ));
        }
        Ok(())
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Universe and decision rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategySettings {
    /// Symbols to acquire, in output column order.
    pub symbols: Vec<String>,
    /// Assets compared by momentum; earlier entries win exact ties.
    pub risk_assets: Vec<String>,
    /// Fallback when no risk asset has positive momentum.
    pub safe_asset: String,
    /// Return horizons in months, averaged into the momentum score.
    pub horizons: Vec<usize>,
    /// History window requested from the provider.
    pub years_back: u32,
}

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            symbols: vec!["VOO".into(), "SCZ".into(), "TLT".into()],
            risk_assets: vec!["VOO".into(), "SCZ".into()],
            safe_asset: "TLT".into(),
            horizons: vec![1, 3, 6],
            years_back: 1,
        }
    }
}

/// Upstream fetch, retry and pacing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Total attempts per symbol (each attempt tries every strategy).
    pub max_retries: u32,
    /// Backoff base: delay before attempt n+1 is `base * 2^(n-1) + jitter`.
    pub base_sleep_secs: f64,
    /// Upper bound of the uniform jitter added to each backoff.
    pub max_jitter_secs: f64,
    /// Calendar days requested by the trailing-window strategies.
    pub trailing_window_days: u32,
    /// Per-request timeout.
    pub request_timeout_secs: u64,
    /// Random pause between symbols, lower bound.
    pub symbol_delay_min_secs: f64,
    /// Random pause between symbols, upper bound.
    pub symbol_delay_max_secs: f64,
    /// Host used by the trailing-window and explicit-range strategies.
    pub primary_host: String,
    /// Hosts tried in order by the direct chart strategy.
    pub chart_hosts: Vec<String>,
    pub user_agent: String,
}

impl FetchSettings {
    pub fn base_sleep(&self) -> Duration {
        Duration::from_secs_f64(self.base_sleep_secs)
    }

    pub fn max_jitter(&self) -> Duration {
        Duration::from_secs_f64(self.max_jitter_secs)
    }

    pub fn symbol_delay(&self) -> (Duration, Duration) {
        (
            Duration::from_secs_f64(self.symbol_delay_min_secs),
            Duration::from_secs_f64(self.symbol_delay_max_secs),
        )
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_sleep_secs: 2.0,
            max_jitter_secs: 0.75,
            trailing_window_days: 450,
            request_timeout_secs: 12,
            symbol_delay_min_secs: 0.2,
            symbol_delay_max_secs: 0.8,
            primary_host: "https://query2.finance.yahoo.com".into(),
            chart_hosts: vec![
                "https://query1.finance.yahoo.com".into(),
                "https://query2.finance.yahoo.com".into(),
            ],
            user_agent: "Mozilla/5.0 (compatible; DualMomentum/0.1)".into(),
        }
    }
}

/// Local price cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub dir: PathBuf,
    /// A cache whose last date is within this many days of the run date is
    /// used without a network call.
    pub staleness_tolerance_days: i64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("cache"),
            staleness_tolerance_days: 1,
        }
    }
}

/// Telegram delivery.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramSettings {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl TelegramSettings {
    /// Both credentials present.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.bot_token.as_deref(), self.chat_id.as_deref()) {
            (Some(token), Some(chat)) => Some((token, chat)),
            _ => None,
        }
    }
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            api_base: "https://api.telegram.org".into(),
            timeout_secs: 15,
        }
    }
}

// Keeps the token out of debug logs.
impl std::fmt::Debug for TelegramSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramSettings")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "<redacted>"))
            .field("chat_id", &self.chat_id)
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

//! Configuration loading from TOML with an environment override.
//!
//! Every setting has a built-in default, so `config.toml` is optional.
//! The starting balance can be overridden with `SIM_START_BALANCE_USD`;
//! an unusable value is logged and replaced by the default.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

use crate::engine::executor::ExecutionConfig;
use crate::market::coinbase::DEFAULT_BASE_URL;
use crate::storage::DEFAULT_TRADE_LOG;
use crate::strategy::StrategyParams;
use crate::types::{Pair, TraderError};

/// Environment variable that overrides the starting balance.
pub const START_BALANCE_ENV: &str = "SIM_START_BALANCE_USD";

/// Starting balance used when none (or an invalid one) is configured.
pub const DEFAULT_START_BALANCE: Decimal = dec!(1000);

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub trading: TradingConfig,
    pub market: MarketConfig,
    pub watchlist: Vec<Pair>,
    pub strategy: StrategyParams,
    pub execution: ExecutionConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TradingConfig {
    pub starting_balance: Decimal,
    /// Sleep between ticks.
    pub poll_interval_secs: u64,
    /// Candle width requested from the quote service.
    pub candle_granularity_secs: u32,
    /// Number of candles fetched per pair per tick.
    pub candle_lookback: u32,
    pub trade_log_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MarketConfig {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            trading: TradingConfig::default(),
            market: MarketConfig::default(),
            watchlist: default_watchlist(),
            strategy: StrategyParams::default(),
            execution: ExecutionConfig::default(),
        }
    }
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            starting_balance: DEFAULT_START_BALANCE,
            poll_interval_secs: 60,
            candle_granularity_secs: 60,
            candle_lookback: 60,
            trade_log_path: DEFAULT_TRADE_LOG.to_string(),
        }
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 30,
        }
    }
}

fn default_watchlist() -> Vec<Pair> {
    ["BTC-USD", "ETH-USD", "SOL-USD", "AVAX-USD", "LINK-USD", "ADA-USD"]
        .into_iter()
        .map(Pair::from)
        .collect()
}

impl AppConfig {
    /// Parse configuration from TOML text. Missing keys take defaults.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(contents).context("Failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, or defaults if it is absent.
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            info!(path, "No config file found, using defaults");
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml(&contents).with_context(|| format!("Invalid config file: {path}"))
    }

    /// Apply the starting-balance override from the environment.
    pub fn apply_env(&mut self) {
        if let Ok(raw) = std::env::var(START_BALANCE_ENV) {
            self.trading.starting_balance = resolve_start_balance(&raw);
        }
    }

    fn validate(&self) -> Result<(), TraderError> {
        if self.watchlist.is_empty() {
            return Err(TraderError::Config("watchlist is empty".into()));
        }
        if self.trading.candle_granularity_secs == 0 {
            return Err(TraderError::Config("candle_granularity_secs must be positive".into()));
        }
        if self.trading.poll_interval_secs == 0 {
            return Err(TraderError::Config("poll_interval_secs must be positive".into()));
        }
        let s = &self.strategy;
        for (name, window) in [
            ("short_window", s.short_window),
            ("long_window", s.long_window),
            ("rsi_period", s.rsi_period),
            ("volatility_period", s.volatility_period),
        ] {
            if window == 0 {
                return Err(TraderError::Config(format!("strategy.{name} must be positive")));
            }
        }
        if self.trading.starting_balance < Decimal::ZERO {
            return Err(TraderError::Config("starting_balance must not be negative".into()));
        }
        Ok(())
    }
}

/// Parse a starting balance, rejecting negatives.
pub fn parse_start_balance(raw: &str) -> Result<Decimal, TraderError> {
    let value = Decimal::from_str(raw.trim())
        .map_err(|e| TraderError::Config(format!("invalid starting balance {raw:?}: {e}")))?;
    if value < Decimal::ZERO {
        return Err(TraderError::Config(format!(
            "starting balance must not be negative, got {value}"
        )));
    }
    Ok(value)
}

/// Parse a starting balance, falling back to the default with a warning.
pub fn resolve_start_balance(raw: &str) -> Decimal {
    match parse_start_balance(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(
                error = %e,
                default = %DEFAULT_START_BALANCE,
                "Invalid {START_BALANCE_ENV}, using default"
            );
            DEFAULT_START_BALANCE
        }
    }
}

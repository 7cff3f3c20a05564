//! Shared types for the paper trader.
//!
//! These types form the data model used across all modules: trading
//! pairs, actions, the virtual portfolio, scan results and trade records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Pair
// ---------------------------------------------------------------------------

/// A quoted trading pair such as `BTC-USD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pair(String);

impl Pair {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The base asset symbol: `BTC` for `BTC-USD`.
    pub fn base(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Pair {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Trading action produced by the decision engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Buy => write!(f, "BUY"),
            Action::Sell => write!(f, "SELL"),
            Action::Hold => write!(f, "HOLD"),
        }
    }
}

/// What the portfolio currently holds, as seen by the decision engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Holding {
    /// Enough USD to buy and no crypto above dust.
    UsdOnly,
    /// A crypto position above dust.
    HoldingCrypto,
    /// Neither: USD at or below the buy minimum and no crypto.
    Depleted,
}

/// Balance thresholds that classify the portfolio and gate execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioLimits {
    /// USD balance must exceed this to buy.
    pub min_usd_to_buy: Decimal,
    /// Crypto balance must exceed this to sell.
    pub min_crypto_to_sell: Decimal,
    /// Crypto below this is dust and treated as zero.
    pub dust_threshold: Decimal,
}

impl Default for PortfolioLimits {
    fn default() -> Self {
        Self {
            min_usd_to_buy: dec!(10),
            min_crypto_to_sell: dec!(0.00001),
            dust_threshold: dec!(0.000001),
        }
    }
}

// ---------------------------------------------------------------------------
// Portfolio state
// ---------------------------------------------------------------------------

/// The virtual portfolio. Lives for the whole process and only changes
/// through `PaperExecutor::execute`, which returns the next state.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioState {
    pub usd_balance: Decimal,
    pub crypto_balance: Decimal,
    pub current_position: Option<Pair>,
    pub entry_price: Option<Decimal>,
    pub trade_count: u64,
    pub trades_by_action: BTreeMap<Action, u64>,
    pub starting_balance: Decimal,
    pub started_at: DateTime<Utc>,
}

impl fmt::Display for PortfolioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "usd=${:.2} | crypto={:.8} | position={} | entry={} | trades={}",
            self.usd_balance,
            self.crypto_balance,
            self.current_position
                .as_ref()
                .map(Pair::as_str)
                .unwrap_or("none"),
            self.entry_price
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string()),
            self.trade_count,
        )
    }
}

impl PortfolioState {
    /// Create an all-USD portfolio with the given starting balance.
    pub fn new(starting_balance: Decimal) -> Self {
        Self::starting_at(starting_balance, Utc::now())
    }

    pub fn starting_at(starting_balance: Decimal, started_at: DateTime<Utc>) -> Self {
        Self {
            usd_balance: starting_balance,
            crypto_balance: Decimal::ZERO,
            current_position: None,
            entry_price: None,
            trade_count: 0,
            trades_by_action: BTreeMap::new(),
            starting_balance,
            started_at,
        }
    }

    /// Classify the portfolio for the decision engine.
    pub fn holding(&self, limits: &PortfolioLimits) -> Holding {
        if self.crypto_balance >= limits.dust_threshold {
            Holding::HoldingCrypto
        } else if self.usd_balance > limits.min_usd_to_buy {
            Holding::UsdOnly
        } else {
            Holding::Depleted
        }
    }

    /// USD plus crypto marked at `price`.
    pub fn portfolio_value(&self, price: Decimal) -> Decimal {
        self.usd_balance + self.crypto_balance * price
    }

    /// Number of executed trades for one action.
    pub fn trades_for(&self, action: Action) -> u64 {
        self.trades_by_action.get(&action).copied().unwrap_or(0)
    }

    /// Bump the trade counters after a fill.
    pub(crate) fn record_trade(&mut self, action: Action) {
        self.trade_count += 1;
        *self.trades_by_action.entry(action).or_insert(0) += 1;
    }

    /// Uptime since the portfolio was created.
    pub fn runtime(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.started_at
    }
}

// ---------------------------------------------------------------------------
// Scan results
// ---------------------------------------------------------------------------

/// Chronological closing prices, oldest first.
pub type PriceSeries = Vec<Decimal>;

/// A scored candidate produced by one scan.
#[derive(Debug, Clone)]
pub struct Opportunity {
    pub pair: Pair,
    pub price: Decimal,
    pub closes: PriceSeries,
    pub score: Decimal,
    pub rsi: Decimal,
    /// Short/long moving-average gap in percent.
    pub trend_strength: Decimal,
}

impl fmt::Display for Opportunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: Score={:.2} | RSI={:.1} | Trend={:.2}%",
            self.pair, self.score, self.rsi, self.trend_strength,
        )
    }
}

// ---------------------------------------------------------------------------
// Trade record
// ---------------------------------------------------------------------------

/// One row of the append-only trade history.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub timestamp: DateTime<Utc>,
    pub pair: Pair,
    pub action: Action,
    pub price: Decimal,
    pub amount: Decimal,
    pub usd_balance: Decimal,
    pub crypto_balance: Decimal,
    pub portfolio_value: Decimal,
    pub profit_loss: Decimal,
}

impl TradeRecord {
    /// Column names of the trade history file, in row order.
    pub const HEADER: [&'static str; 9] = [
        "Timestamp",
        "Pair",
        "Action",
        "Price",
        "Amount",
        "USD_Balance",
        "Crypto_Balance",
        "Portfolio_Value",
        "Profit_Loss",
    ];

    /// Render as exact decimal text, matching `HEADER`.
    pub fn to_row(&self) -> [String; 9] {
        [
            self.timestamp.to_rfc3339(),
            self.pair.to_string(),
            self.action.to_string(),
            self.price.to_string(),
            self.amount.to_string(),
            self.usd_balance.to_string(),
            self.crypto_balance.to_string(),
            self.portfolio_value.to_string(),
            self.profit_loss.to_string(),
        ]
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum TraderError {
    #[error("Market data error ({source_name}): {message}")]
    MarketData { source_name: String, message: String },

    #[error("Malformed response for {pair}: {message}")]
    MalformedResponse { pair: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

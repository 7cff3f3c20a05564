//! Accountant: valuation, trade records and the daily summary.
//!
//! Marks the portfolio to market, turns fills into trade-history rows and
//! builds the once-a-day performance report.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::fmt;

use crate::engine::executor::Fill;
use crate::types::{Action, Pair, PortfolioState, TradeRecord};

// ---------------------------------------------------------------------------
// Valuation
// ---------------------------------------------------------------------------

/// Portfolio marked at one price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Valuation {
    pub value: Decimal,
    pub profit_loss: Decimal,
    /// Profit as a percentage of the starting balance.
    pub profit_pct: Decimal,
}

pub struct Accountant;

impl Accountant {
    /// Value = USD + crypto × price; profit is measured against the
    /// starting balance.
    pub fn valuation(state: &PortfolioState, mark_price: Decimal) -> Valuation {
        let value = state.portfolio_value(mark_price);
        let profit_loss = value - state.starting_balance;
        let profit_pct = if state.starting_balance.is_zero() {
            Decimal::ZERO
        } else {
            profit_loss / state.starting_balance * dec!(100)
        };
        Valuation {
            value,
            profit_loss,
            profit_pct,
        }
    }

    /// History row for a fill, valued at the fill price against the
    /// post-trade state.
    pub fn trade_record(state: &PortfolioState, fill: &Fill, timestamp: DateTime<Utc>) -> TradeRecord {
        let valuation = Self::valuation(state, fill.price);
        TradeRecord {
            timestamp,
            pair: fill.pair.clone(),
            action: fill.action,
            price: fill.price,
            amount: fill.amount,
            usd_balance: state.usd_balance,
            crypto_balance: state.crypto_balance,
            portfolio_value: valuation.value,
            profit_loss: valuation.profit_loss,
        }
    }
}

// ---------------------------------------------------------------------------
// Daily summary
// ---------------------------------------------------------------------------

/// Performance report printed once per UTC day.
#[derive(Debug, Clone)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub runtime: chrono::Duration,
    pub starting_balance: Decimal,
    pub valuation: Valuation,
    pub trade_count: u64,
    pub buys: u64,
    pub sells: u64,
    pub usd_balance: Decimal,
    pub crypto_balance: Decimal,
    pub position: Option<Pair>,
    pub watchlist: Vec<Pair>,
}

impl DailySummary {
    pub fn build(
        state: &PortfolioState,
        mark_price: Decimal,
        watchlist: &[Pair],
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            date: now.date_naive(),
            runtime: state.runtime(now),
            starting_balance: state.starting_balance,
            valuation: Accountant::valuation(state, mark_price),
            trade_count: state.trade_count,
            buys: state.trades_for(Action::Buy),
            sells: state.trades_for(Action::Sell),
            usd_balance: state.usd_balance,
            crypto_balance: state.crypto_balance,
            position: state.current_position.clone(),
            watchlist: watchlist.to_vec(),
        }
    }
}

impl fmt::Display for DailySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(70);
        let sign = if self.valuation.profit_pct.is_sign_negative() { "" } else { "+" };
        let holdings = match &self.position {
            Some(pair) => format!("{:.8} {}", self.crypto_balance, pair.base()),
            None => "USD only".to_string(),
        };
        let watching: Vec<&str> = self.watchlist.iter().map(Pair::as_str).collect();

        writeln!(f, "{rule}")?;
        writeln!(f, "DAILY SUMMARY - {}", self.date.format("%Y-%m-%d"))?;
        writeln!(f, "{rule}")?;
        writeln!(
            f,
            "Runtime: {} days, {} hours",
            self.runtime.num_days(),
            self.runtime.num_hours() % 24
        )?;
        writeln!(f, "Starting Balance: ${}", self.starting_balance)?;
        writeln!(f, "Current Value: ${:.2}", self.valuation.value)?;
        writeln!(
            f,
            "Profit/Loss: ${:.2} ({sign}{:.2}%)",
            self.valuation.profit_loss, self.valuation.profit_pct
        )?;
        writeln!(
            f,
            "Total Trades: {} (Buy: {}, Sell: {})",
            self.trade_count, self.buys, self.sells
        )?;
        writeln!(f, "Holdings: ${:.2} USD + {holdings}", self.usd_balance)?;
        writeln!(
            f,
            "Current Position: {}",
            self.position
                .as_ref()
                .map(Pair::as_str)
                .unwrap_or("None (all USD)")
        )?;
        writeln!(f, "Watching: {}", watching.join(", "))?;
        write!(f, "{rule}")
    }
}

/// Fires on the first check and then once per UTC calendar day.
#[derive(Debug, Default)]
pub struct SummarySchedule {
    last_day: Option<NaiveDate>,
}

impl SummarySchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a summary is due at `now`; marks the day as reported.
    pub fn due(&mut self, now: DateTime<Utc>) -> bool {
        let today = now.date_naive();
        if self.last_day == Some(today) {
            return false;
        }
        self.last_day = Some(today);
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

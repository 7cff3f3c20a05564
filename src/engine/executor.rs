//! Paper executor.
//!
//! Applies BUY/SELL decisions to the virtual portfolio. Execution is a
//! pure state transition: it takes the current state by reference and
//! hands back the next state with a description of the fill. A failed
//! precondition is a no-op, never an error.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::fmt;
use tracing::{debug, info};

use crate::types::{Action, Pair, PortfolioLimits, PortfolioState};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Fraction of the USD balance spent per buy.
    pub buy_fraction: Decimal,
    /// Fraction of the crypto balance sold per sell.
    pub sell_fraction: Decimal,
    pub crypto_decimal_places: u32,
    pub usd_decimal_places: u32,
    pub limits: PortfolioLimits,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            buy_fraction: dec!(0.2),
            sell_fraction: dec!(0.5),
            crypto_decimal_places: 8,
            usd_decimal_places: 2,
            limits: PortfolioLimits::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Execution result
// ---------------------------------------------------------------------------

/// A simulated fill.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub action: Action,
    pub pair: Pair,
    pub price: Decimal,
    /// Crypto bought or sold.
    pub amount: Decimal,
    /// USD spent (buy) or received (sell).
    pub usd_amount: Decimal,
}

impl fmt::Display for Fill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} @ {}",
            self.action,
            self.amount,
            self.pair.base(),
            self.price
        )
    }
}

/// The next portfolio state together with the fill that produced it.
#[derive(Debug, Clone)]
pub struct Execution {
    pub state: PortfolioState,
    pub fill: Fill,
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

pub struct PaperExecutor {
    config: ExecutionConfig,
}

impl PaperExecutor {
    pub fn new(config: ExecutionConfig) -> Self {
        Self { config }
    }

    /// Simulate `action` on `pair` at `price`.
    ///
    /// Returns `None` when nothing happens: HOLD, a failed precondition,
    /// or an amount that rounds to zero.
    pub fn execute(
        &self,
        state: &PortfolioState,
        action: Action,
        pair: &Pair,
        price: Decimal,
    ) -> Option<Execution> {
        let execution = match action {
            Action::Buy => self.buy(state, pair, price),
            Action::Sell => self.sell(state, pair, price),
            Action::Hold => None,
        };

        match &execution {
            Some(exec) => info!(
                fill = %exec.fill,
                usd = format!("${:.2}", exec.state.usd_balance),
                crypto = %exec.state.crypto_balance,
                "Paper trade executed"
            ),
            None if action != Action::Hold => debug!(
                action = %action,
                pair = %pair,
                "Paper trade skipped (preconditions not met)"
            ),
            None => {}
        }

        execution
    }

    fn buy(&self, state: &PortfolioState, pair: &Pair, price: Decimal) -> Option<Execution> {
        let cfg = &self.config;
        if state.usd_balance <= cfg.limits.min_usd_to_buy || price <= Decimal::ZERO {
            return None;
        }
        // One position at a time.
        if state.current_position.as_ref().is_some_and(|held| held != pair) {
            return None;
        }

        let usd_to_spend = state.usd_balance * cfg.buy_fraction;
        let amount = (usd_to_spend / price).round_dp(cfg.crypto_decimal_places);
        if amount <= Decimal::ZERO {
            return None;
        }

        let mut next = state.clone();
        next.usd_balance -= usd_to_spend;
        next.crypto_balance += amount;
        next.current_position = Some(pair.clone());
        next.entry_price = Some(price);
        next.record_trade(Action::Buy);

        Some(Execution {
            state: next,
            fill: Fill {
                action: Action::Buy,
                pair: pair.clone(),
                price,
                amount,
                usd_amount: usd_to_spend,
            },
        })
    }

    fn sell(&self, state: &PortfolioState, pair: &Pair, price: Decimal) -> Option<Execution> {
        let cfg = &self.config;
        if state.crypto_balance <= cfg.limits.min_crypto_to_sell || price <= Decimal::ZERO {
            return None;
        }
        if state.current_position.as_ref().is_some_and(|held| held != pair) {
            return None;
        }

        let amount = (state.crypto_balance * cfg.sell_fraction).round_dp(cfg.crypto_decimal_places);
        if amount <= Decimal::ZERO {
            return None;
        }
        let usd_gained = (amount * price).round_dp(cfg.usd_decimal_places);

        let mut next = state.clone();
        next.crypto_balance -= amount;
        next.usd_balance += usd_gained;
        if next.crypto_balance < cfg.limits.dust_threshold {
            // Dust cleanup: back to USD only.
            next.crypto_balance = Decimal::ZERO;
            next.current_position = None;
            next.entry_price = None;
        }
        next.record_trade(Action::Sell);

        Some(Execution {
            state: next,
            fill: Fill {
                action: Action::Sell,
                pair: pair.clone(),
                price,
                amount,
                usd_amount: usd_gained,
            },
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

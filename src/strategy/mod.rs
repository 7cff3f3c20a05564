//! Decision engine: opportunity scoring and the BUY/SELL/HOLD rule.
//!
//! The engine is a pure function of the portfolio state it is handed and
//! the indicators of the pair under consideration. It never mutates state;
//! applying a decision is the executor's job.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::fmt;
use tracing::debug;

use crate::indicators::IndicatorSet;
use crate::types::{Action, Holding, PortfolioLimits, PortfolioState};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Indicator windows, scoring weights and entry/exit thresholds.
///
/// The thresholds are empirical; they are exposed as configuration rather
/// than derived from anything.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StrategyParams {
    pub short_window: usize,
    pub long_window: usize,
    pub rsi_period: usize,
    pub volatility_period: usize,
    /// RSI level that scores zero; lower RSI scores higher.
    pub rsi_pivot: Decimal,
    /// Divides the RSI component of the score.
    pub rsi_score_divisor: Decimal,
    /// Buy only below this RSI.
    pub entry_rsi_max: Decimal,
    /// Sell above this RSI.
    pub exit_rsi_min: Decimal,
    /// Minimum volatility (percent) required to enter.
    pub min_volatility_pct: Decimal,
    /// Sell when profit falls to this percent (negative).
    pub stop_loss_pct: Decimal,
    /// Sell when profit reaches this percent.
    pub take_profit_pct: Decimal,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            short_window: 9,
            long_window: 21,
            rsi_period: 14,
            volatility_period: 20,
            rsi_pivot: dec!(60),
            rsi_score_divisor: dec!(10),
            entry_rsi_max: dec!(65),
            exit_rsi_min: dec!(65),
            min_volatility_pct: dec!(1.5),
            stop_loss_pct: dec!(-2),
            take_profit_pct: dec!(3),
        }
    }
}

impl StrategyParams {
    /// Short/long moving-average gap as a percentage of the long average.
    /// `None` when the long average is zero.
    pub fn trend_strength(&self, short_ma: Decimal, long_ma: Decimal) -> Option<Decimal> {
        if long_ma.is_zero() {
            return None;
        }
        Some((short_ma - long_ma) / long_ma * dec!(100))
    }

    /// Composite opportunity score: strong uptrend plus low RSI ranks first.
    pub fn opportunity_score(&self, trend_strength: Decimal, rsi: Decimal) -> Decimal {
        let rsi_score = self.rsi_pivot - rsi;
        if self.rsi_score_divisor.is_zero() {
            return trend_strength;
        }
        trend_strength + rsi_score / self.rsi_score_divisor
    }
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Which rule produced the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    /// Nothing in this scan to decide on.
    NoOpportunity,
    /// At least one indicator is undefined.
    InsufficientData,
    /// Uptrend, RSI below the entry cap, enough volatility.
    EntrySignal,
    StopLoss,
    TakeProfit,
    /// Short average crossed below the long average.
    TrendReversal,
    Overbought,
    NoSignal,
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DecisionReason::NoOpportunity => "no opportunity",
            DecisionReason::InsufficientData => "insufficient data",
            DecisionReason::EntrySignal => "entry signal",
            DecisionReason::StopLoss => "stop loss",
            DecisionReason::TakeProfit => "take profit",
            DecisionReason::TrendReversal => "trend reversal",
            DecisionReason::Overbought => "overbought",
            DecisionReason::NoSignal => "no signal",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub action: Action,
    pub reason: DecisionReason,
}

impl Decision {
    pub fn hold(reason: DecisionReason) -> Self {
        Self { action: Action::Hold, reason }
    }

    fn buy() -> Self {
        Self { action: Action::Buy, reason: DecisionReason::EntrySignal }
    }

    fn sell(reason: DecisionReason) -> Self {
        Self { action: Action::Sell, reason }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct DecisionEngine {
    params: StrategyParams,
    limits: PortfolioLimits,
}

impl DecisionEngine {
    pub fn new(params: StrategyParams, limits: PortfolioLimits) -> Self {
        Self { params, limits }
    }

    pub fn params(&self) -> &StrategyParams {
        &self.params
    }

    /// Decide what to do with the pair trading at `price`.
    ///
    /// With USD only: buy on an uptrend that is not overbought and moves
    /// enough. Holding crypto: sell on stop loss, take profit, a bearish
    /// cross, or overbought RSI. Anything else holds.
    pub fn decide(
        &self,
        state: &PortfolioState,
        price: Decimal,
        indicators: &IndicatorSet,
    ) -> Decision {
        let Some(sig) = indicators.complete() else {
            return Decision::hold(DecisionReason::InsufficientData);
        };
        let p = &self.params;

        let decision = match state.holding(&self.limits) {
            Holding::UsdOnly => {
                if sig.short_ma > sig.long_ma
                    && sig.rsi < p.entry_rsi_max
                    && sig.volatility >= p.min_volatility_pct
                {
                    Decision::buy()
                } else {
                    Decision::hold(DecisionReason::NoSignal)
                }
            }
            Holding::HoldingCrypto => {
                let profit_pct = state
                    .entry_price
                    .filter(|entry| !entry.is_zero())
                    .map(|entry| (price - entry) / entry * dec!(100));

                match profit_pct {
                    Some(pct) if pct <= p.stop_loss_pct => {
                        Decision::sell(DecisionReason::StopLoss)
                    }
                    Some(pct) if pct >= p.take_profit_pct => {
                        Decision::sell(DecisionReason::TakeProfit)
                    }
                    _ if sig.short_ma < sig.long_ma => {
                        Decision::sell(DecisionReason::TrendReversal)
                    }
                    _ if sig.rsi > p.exit_rsi_min => Decision::sell(DecisionReason::Overbought),
                    _ => Decision::hold(DecisionReason::NoSignal),
                }
            }
            Holding::Depleted => Decision::hold(DecisionReason::NoSignal),
        };

        debug!(
            action = %decision.action,
            reason = %decision.reason,
            short_ma = %sig.short_ma.round_dp(4),
            long_ma = %sig.long_ma.round_dp(4),
            rsi = %sig.rsi.round_dp(2),
            volatility = %sig.volatility.round_dp(2),
            "Decision made"
        );

        decision
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

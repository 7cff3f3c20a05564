//! Technical indicators over closing-price series.
//!
//! Pure functions on `Decimal` slices, oldest value first. Each returns
//! `None` when the series is too short for the requested period.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::strategy::StrategyParams;

/// Simple moving average of the last `period` values.
pub fn sma(values: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || values.len() < period {
        return None;
    }
    let window = &values[values.len() - period..];
    let sum: Decimal = window.iter().sum();
    Some(sum / Decimal::from(period))
}

/// Relative Strength Index over the last `period` price changes.
///
/// Needs `period + 1` closes. Returns 50 for a flat window and 100 when
/// there were gains but no losses.
pub fn rsi(values: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || values.len() <= period {
        return None;
    }

    let window = &values[values.len() - period - 1..];
    let (gains, losses) = window
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold((Decimal::ZERO, Decimal::ZERO), |(g, l), diff| {
            if diff > Decimal::ZERO {
                (g + diff, l)
            } else {
                (g, l - diff)
            }
        });

    let n = Decimal::from(period);
    let avg_gain = gains / n;
    let avg_loss = losses / n;

    if avg_gain.is_zero() && avg_loss.is_zero() {
        return Some(dec!(50));
    }
    if avg_loss.is_zero() {
        return Some(dec!(100));
    }

    let rs = avg_gain / avg_loss;
    Some(dec!(100) - dec!(100) / (Decimal::ONE + rs))
}

/// Price range of the last `period` values as a percentage of their mean.
pub fn volatility(values: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || values.len() < period {
        return None;
    }

    let window = &values[values.len() - period..];
    let high = window.iter().copied().max()?;
    let low = window.iter().copied().min()?;
    let mean = window.iter().sum::<Decimal>() / Decimal::from(period);

    if mean.is_zero() {
        return Some(Decimal::ZERO);
    }
    Some((high - low) / mean * dec!(100))
}

// ---------------------------------------------------------------------------
// Indicator bundle
// ---------------------------------------------------------------------------

/// All indicators the decision engine looks at, computed on one series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorSet {
    pub short_ma: Option<Decimal>,
    pub long_ma: Option<Decimal>,
    pub rsi: Option<Decimal>,
    pub volatility: Option<Decimal>,
}

/// The four indicators, all defined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signals {
    pub short_ma: Decimal,
    pub long_ma: Decimal,
    pub rsi: Decimal,
    pub volatility: Decimal,
}

impl IndicatorSet {
    pub fn compute(closes: &[Decimal], params: &StrategyParams) -> Self {
        Self {
            short_ma: sma(closes, params.short_window),
            long_ma: sma(closes, params.long_window),
            rsi: rsi(closes, params.rsi_period),
            volatility: volatility(closes, params.volatility_period),
        }
    }

    /// `Some` only when every indicator is defined.
    pub fn complete(&self) -> Option<Signals> {
        Some(Signals {
            short_ma: self.short_ma?,
            long_ma: self.long_ma?,
            rsi: self.rsi?,
            volatility: self.volatility?,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

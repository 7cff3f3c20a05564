//! Market data sources.
//!
//! Defines the `MarketDataSource` trait and provides the Coinbase
//! Exchange public-API implementation. Sources are read-only: they quote
//! prices and candles, nothing else.

pub mod coinbase;

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::types::{Pair, PriceSeries};

/// Abstraction over public quote services.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Latest traded price for a pair.
    async fn latest_price(&self, pair: &Pair) -> Result<Decimal>;

    /// Up to `limit` recent per-candle closing prices, oldest first.
    async fn recent_closes(&self, pair: &Pair, limit: u32) -> Result<PriceSeries>;

    /// Source name for logging and identification.
    fn name(&self) -> &str;
}

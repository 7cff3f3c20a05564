//! Mock market feed for integration testing.
//!
//! Provides a deterministic `MarketDataSource` whose quotes and candle
//! closes are set from test code, all in-memory with no network access.
//! Clones share state, so a test can keep a handle after boxing one copy
//! into the engine.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use paper_trader::market::MarketDataSource;
use paper_trader::types::{Pair, PriceSeries};

#[derive(Debug, Clone, Default)]
struct Quote {
    price: Decimal,
    closes: PriceSeries,
}

/// A mock quote service for deterministic testing.
#[derive(Clone, Default)]
pub struct MockFeed {
    quotes: Arc<Mutex<HashMap<Pair, Quote>>>,
    /// Pairs whose requests fail with the stored message.
    failing: Arc<Mutex<HashMap<Pair, String>>>,
    requests: Arc<Mutex<Vec<(Pair, u32)>>>,
}

impl MockFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set both the candle closes and the latest price of a pair.
    pub fn set_market(&self, pair: &str, closes: PriceSeries, price: Decimal) {
        self.quotes
            .lock()
            .unwrap()
            .insert(Pair::from(pair), Quote { price, closes });
    }

    /// Change only the latest price of a pair.
    pub fn set_price(&self, pair: &str, price: Decimal) {
        self.quotes
            .lock()
            .unwrap()
            .entry(Pair::from(pair))
            .or_default()
            .price = price;
    }

    /// Force every request for `pair` to fail.
    pub fn set_error(&self, pair: &str, msg: &str) {
        self.failing
            .lock()
            .unwrap()
            .insert(Pair::from(pair), msg.to_string());
    }

    /// Clear a forced error.
    pub fn clear_error(&self, pair: &str) {
        self.failing.lock().unwrap().remove(&Pair::from(pair));
    }

    /// Candle requests seen so far, as `(pair, limit)`.
    pub fn candle_requests(&self) -> Vec<(Pair, u32)> {
        self.requests.lock().unwrap().clone()
    }

    fn check(&self, pair: &Pair) -> Result<Quote> {
        if let Some(err) = self.failing.lock().unwrap().get(pair) {
            return Err(anyhow!("{}", err));
        }
        self.quotes
            .lock()
            .unwrap()
            .get(pair)
            .cloned()
            .ok_or_else(|| anyhow!("HTTP 404: unknown product {pair}"))
    }
}

#[async_trait]
impl MarketDataSource for MockFeed {
    async fn latest_price(&self, pair: &Pair) -> Result<Decimal> {
        Ok(self.check(pair)?.price)
    }

    async fn recent_closes(&self, pair: &Pair, limit: u32) -> Result<PriceSeries> {
        self.requests.lock().unwrap().push((pair.clone(), limit));
        let closes = self.check(pair)?.closes;
        let skip = closes.len().saturating_sub(limit as usize);
        Ok(closes[skip..].to_vec())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

//! Watchlist scanner.
//!
//! Fetches recent closes and the latest price for every watched pair,
//! scores each one and ranks them best first. A pair that fails to fetch
//! or lacks data is skipped for this scan only; the scan itself never
//! fails.

use anyhow::Result;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::indicators::{rsi, sma};
use crate::market::MarketDataSource;
use crate::strategy::StrategyParams;
use crate::types::{Opportunity, Pair, PriceSeries};

pub struct OpportunityScanner {
    source: Box<dyn MarketDataSource>,
    watchlist: Vec<Pair>,
    /// Candles requested per pair.
    lookback: u32,
    params: StrategyParams,
}

impl OpportunityScanner {
    pub fn new(
        source: Box<dyn MarketDataSource>,
        watchlist: Vec<Pair>,
        lookback: u32,
        params: StrategyParams,
    ) -> Self {
        Self {
            source,
            watchlist,
            lookback,
            params,
        }
    }

    pub fn watchlist(&self) -> &[Pair] {
        &self.watchlist
    }

    /// Scan the watchlist one pair at a time and return the scored pairs,
    /// highest score first. Empty when no pair has enough data.
    pub async fn scan(&self) -> Vec<Opportunity> {
        let mut ranked = Vec::with_capacity(self.watchlist.len());

        for pair in &self.watchlist {
            let (closes, price) = match self.fetch(pair).await {
                Ok(data) => data,
                Err(e) => {
                    warn!(pair = %pair, error = %e, "Scan failed for pair, skipping");
                    continue;
                }
            };

            match self.score(pair, price, closes) {
                Some(opp) => ranked.push(opp),
                None => debug!(pair = %pair, "Not enough data to score pair"),
            }
        }

        ranked.sort_by(|a, b| b.score.cmp(&a.score));

        if ranked.is_empty() {
            info!(watched = self.watchlist.len(), "No scorable opportunities this scan");
        } else {
            info!(
                scored = ranked.len(),
                watched = self.watchlist.len(),
                best = %ranked[0].pair,
                "Scan complete"
            );
        }

        ranked
    }

    async fn fetch(&self, pair: &Pair) -> Result<(PriceSeries, Decimal)> {
        let closes = self.source.recent_closes(pair, self.lookback).await?;
        let price = self.source.latest_price(pair).await?;
        Ok((closes, price))
    }

    /// Score one pair. `None` when the moving averages or RSI are
    /// undefined, or the long average is zero.
    fn score(&self, pair: &Pair, price: Decimal, closes: PriceSeries) -> Option<Opportunity> {
        let p = &self.params;
        let short_ma = sma(&closes, p.short_window)?;
        let long_ma = sma(&closes, p.long_window)?;
        let current_rsi = rsi(&closes, p.rsi_period)?;

        let trend_strength = p.trend_strength(short_ma, long_ma)?;
        let score = p.opportunity_score(trend_strength, current_rsi);

        Some(Opportunity {
            pair: pair.clone(),
            price,
            closes,
            score,
            rsi: current_rsi,
            trend_strength,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Coinbase Exchange public market data.
//!
//! Read-only quotes for spot pairs. No account, no authentication.
//!
//! API docs: https://docs.cdp.coinbase.com/exchange/reference
//! Base URL: https://api.exchange.coinbase.com
//! Endpoints used:
//!   GET /products/{pair}/ticker
//!   GET /products/{pair}/candles?start=..&end=..&granularity=..
//! Candle rows are `[time, low, high, open, close, volume]`, newest first.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use tracing::debug;

use super::MarketDataSource;
use crate::types::{Pair, PriceSeries, TraderError};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

pub const DEFAULT_BASE_URL: &str = "https://api.exchange.coinbase.com";
const SOURCE_NAME: &str = "coinbase";

/// Index of the close price within a candle row.
const CLOSE_INDEX: usize = 4;

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

/// `/products/{pair}/ticker`. Prices arrive as decimal strings.
#[derive(Debug, Deserialize)]
struct Ticker {
    price: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct CoinbaseClient {
    http: Client,
    base_url: String,
    /// Candle width in seconds.
    granularity_secs: u32,
}

impl CoinbaseClient {
    pub fn new(base_url: &str, granularity_secs: u32, timeout_secs: u64) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .user_agent("paper-trader/0.1.0")
            .build()
            .context("Failed to build HTTP client for Coinbase")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            granularity_secs,
        })
    }

    fn ticker_url(&self, pair: &Pair) -> String {
        format!(
            "{}/products/{}/ticker",
            self.base_url,
            urlencoding::encode(pair.as_str())
        )
    }

    /// Candle query covering `limit` candles ending at `end`.
    fn candles_url(&self, pair: &Pair, limit: u32, end: DateTime<Utc>) -> String {
        let span = Duration::seconds(i64::from(limit) * i64::from(self.granularity_secs));
        let start = end - span;
        format!(
            "{}/products/{}/candles?start={}&end={}&granularity={}",
            self.base_url,
            urlencoding::encode(pair.as_str()),
            urlencoding::encode(&start.to_rfc3339_opts(SecondsFormat::Secs, true)),
            urlencoding::encode(&end.to_rfc3339_opts(SecondsFormat::Secs, true)),
            self.granularity_secs,
        )
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!(url = %url, "Fetching Coinbase data");

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .context("Coinbase API request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(TraderError::MarketData {
                source_name: SOURCE_NAME.to_string(),
                message: format!("HTTP {status}: {body}"),
            }
            .into());
        }

        resp.json()
            .await
            .context("Failed to parse Coinbase response body")
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a ticker price string.
fn parse_price(pair: &Pair, raw: &str) -> Result<Decimal, TraderError> {
    Decimal::from_str(raw.trim()).map_err(|e| TraderError::MalformedResponse {
        pair: pair.to_string(),
        message: format!("invalid price {raw:?}: {e}"),
    })
}

/// Convert a JSON number to `Decimal` through its textual form, so that
/// `0.1` stays `0.1`.
fn json_to_decimal(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
        }
        serde_json::Value::String(s) => Decimal::from_str(s).ok(),
        _ => None,
    }
}

/// Extract closing prices from newest-first candle rows, returned oldest
/// first.
fn parse_closes(pair: &Pair, rows: &[Vec<serde_json::Value>]) -> Result<PriceSeries, TraderError> {
    let mut closes = rows
        .iter()
        .map(|row| {
            row.get(CLOSE_INDEX)
                .and_then(json_to_decimal)
                .ok_or_else(|| TraderError::MalformedResponse {
                    pair: pair.to_string(),
                    message: format!("candle row without a numeric close: {row:?}"),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    closes.reverse();
    Ok(closes)
}

// ---------------------------------------------------------------------------
// MarketDataSource trait implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl MarketDataSource for CoinbaseClient {
    async fn latest_price(&self, pair: &Pair) -> Result<Decimal> {
        let ticker: Ticker = self
            .get_json(&self.ticker_url(pair))
            .await
            .with_context(|| format!("Ticker request for {pair} failed"))?;
        Ok(parse_price(pair, &ticker.price)?)
    }

    async fn recent_closes(&self, pair: &Pair, limit: u32) -> Result<PriceSeries> {
        let rows: Vec<Vec<serde_json::Value>> = self
            .get_json(&self.candles_url(pair, limit, Utc::now()))
            .await
            .with_context(|| format!("Candle request for {pair} failed"))?;
        let closes = parse_closes(pair, &rows)?;
        debug!(pair = %pair, candles = closes.len(), "Candles fetched");
        Ok(closes)
    }

    fn name(&self) -> &str {
        SOURCE_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

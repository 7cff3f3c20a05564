//! End-to-end trading simulation.
//!
//! Drives full ticks through the engine built from configuration, with a
//! scripted feed, and checks the portfolio and the CSV trade history.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::path::{Path, PathBuf};

use paper_trader::config::AppConfig;
use paper_trader::engine::TradingEngine;
use paper_trader::strategy::DecisionReason;
use paper_trader::types::{Action, Pair, PriceSeries, TradeRecord};

use crate::mock_feed::MockFeed;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

fn temp_log() -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("paper_trader_sim_{}.csv", uuid::Uuid::new_v4()));
    p
}

/// Alternating steps from 100: `(up, down)` of `(3, -2)` rises with RSI 60,
/// `(-3, 2)` falls with RSI 40.
fn zigzag(up: i64, down: i64, len: usize) -> PriceSeries {
    let mut closes = vec![dec!(100)];
    for i in 1..len {
        let step = if (i - 1) % 2 == 0 { up } else { down };
        closes.push(closes[i - 1] + Decimal::from(step));
    }
    closes
}

fn config(watchlist: &[&str], log: &Path) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.watchlist = watchlist.iter().map(|&p| Pair::from(p)).collect();
    cfg.trading.trade_log_path = log.to_string_lossy().to_string();
    cfg
}

/// Feed where ETH is the only pair with an entry signal.
fn feed() -> MockFeed {
    let feed = MockFeed::new();
    feed.set_market("BTC-USD", vec![dec!(60000); 60], dec!(60000));
    feed.set_market("ETH-USD", zigzag(3, -2, 60), dec!(110));
    feed.set_market("SOL-USD", zigzag(-3, 2, 60), dec!(50));
    feed
}

fn history(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let header = reader.headers().unwrap().iter().map(str::to_string).collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect();
    (header, rows)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_buy_then_take_profit() {
    let log = temp_log();
    let feed = feed();
    let cfg = config(&["BTC-USD", "ETH-USD", "SOL-USD"], &log);
    let mut engine = TradingEngine::from_config(&cfg, Box::new(feed.clone())).unwrap();

    // Tick 1: ETH ranks first and gets 20% of the USD.
    let report = engine.tick(t0()).await.unwrap();
    assert_eq!(report.opportunities.len(), 3);
    assert_eq!(report.best, Some(Pair::from("ETH-USD")));
    assert_eq!(report.decision.action, Action::Buy);
    assert_eq!(engine.state().usd_balance, dec!(800));
    assert_eq!(engine.state().crypto_balance, dec!(1.81818182));
    assert_eq!(engine.state().entry_price, Some(dec!(110)));

    // Tick 2: +3% on the held pair.
    feed.set_price("ETH-USD", dec!(113.3));
    let report = engine.tick(t0() + Duration::minutes(1)).await.unwrap();
    assert_eq!(report.subject, Some(Pair::from("ETH-USD")));
    assert_eq!(report.decision.action, Action::Sell);
    assert_eq!(report.decision.reason, DecisionReason::TakeProfit);
    assert_eq!(engine.state().crypto_balance, dec!(0.90909091));
    assert_eq!(engine.state().usd_balance, dec!(903));
    assert_eq!(engine.state().trade_count, 2);

    let (header, rows) = history(&log);
    assert_eq!(header, TradeRecord::HEADER.to_vec());
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][1], "ETH-USD");
    assert_eq!(rows[0][2], "BUY");
    assert_eq!(rows[0][3], "110");
    assert_eq!(rows[0][4], "1.81818182");
    assert_eq!(rows[1][2], "SELL");
    assert_eq!(rows[1][4], "0.90909091");

    std::fs::remove_file(&log).unwrap();
}

#[tokio::test]
async fn test_two_sells_leave_a_quarter() {
    let log = temp_log();
    let feed = feed();
    let mut engine =
        TradingEngine::from_config(&config(&["ETH-USD"], &log), Box::new(feed.clone())).unwrap();

    engine.tick(t0()).await.unwrap();
    let bought = engine.state().crypto_balance;

    feed.set_price("ETH-USD", dec!(113.3));
    engine.tick(t0() + Duration::minutes(1)).await.unwrap();
    engine.tick(t0() + Duration::minutes(2)).await.unwrap();

    let left = engine.state().crypto_balance;
    assert_eq!(engine.state().trades_for(Action::Sell), 2);
    assert!(left > Decimal::ZERO);
    assert!((left - bought / dec!(4)).abs() < dec!(0.00000001));
    assert_eq!(engine.state().current_position, Some(Pair::from("ETH-USD")));

    std::fs::remove_file(&log).unwrap();
}

#[tokio::test]
async fn test_stop_loss_exit() {
    let log = temp_log();
    let feed = feed();
    let mut engine =
        TradingEngine::from_config(&config(&["ETH-USD"], &log), Box::new(feed.clone())).unwrap();

    engine.tick(t0()).await.unwrap();
    feed.set_price("ETH-USD", dec!(107.8));
    let report = engine.tick(t0() + Duration::minutes(1)).await.unwrap();

    assert_eq!(report.decision.action, Action::Sell);
    assert_eq!(report.decision.reason, DecisionReason::StopLoss);
    // 0.90909091 × 107.8 = 98.000000098
    assert_eq!(report.fill.unwrap().usd_amount, dec!(98.00));

    std::fs::remove_file(&log).unwrap();
}

#[tokio::test]
async fn test_trend_reversal_exit() {
    let log = temp_log();
    let feed = feed();
    let mut engine =
        TradingEngine::from_config(&config(&["ETH-USD"], &log), Box::new(feed.clone())).unwrap();

    engine.tick(t0()).await.unwrap();
    feed.set_market("ETH-USD", zigzag(-3, 2, 60), dec!(110));
    let report = engine.tick(t0() + Duration::minutes(1)).await.unwrap();

    assert_eq!(report.decision.action, Action::Sell);
    assert_eq!(report.decision.reason, DecisionReason::TrendReversal);

    std::fs::remove_file(&log).unwrap();
}

#[tokio::test]
async fn test_failing_pair_is_skipped() {
    let log = temp_log();
    let feed = feed();
    feed.set_error("ETH-USD", "HTTP 503: service unavailable");
    let mut engine = TradingEngine::from_config(
        &config(&["BTC-USD", "ETH-USD", "SOL-USD"], &log),
        Box::new(feed.clone()),
    )
    .unwrap();

    let report = engine.tick(t0()).await.unwrap();
    let ranked: Vec<&str> = report.opportunities.iter().map(|o| o.pair.as_str()).collect();
    assert!(!ranked.contains(&"ETH-USD"));
    assert_eq!(ranked.len(), 2);

    // The feed recovers on the next tick.
    feed.clear_error("ETH-USD");
    let report = engine.tick(t0() + Duration::minutes(1)).await.unwrap();
    assert_eq!(report.best, Some(Pair::from("ETH-USD")));
    assert_eq!(report.decision.action, Action::Buy);

    std::fs::remove_file(&log).unwrap();
}

#[tokio::test]
async fn test_all_pairs_failing_holds() {
    let log = temp_log();
    let feed = MockFeed::new();
    let mut engine =
        TradingEngine::from_config(&config(&["BTC-USD", "ETH-USD"], &log), Box::new(feed)).unwrap();

    let report = engine.tick(t0()).await.unwrap();
    assert!(report.opportunities.is_empty());
    assert_eq!(report.decision.action, Action::Hold);
    assert_eq!(report.decision.reason, DecisionReason::NoOpportunity);
    assert_eq!(engine.state().usd_balance, dec!(1000));

    let (_, rows) = history(&log);
    assert!(rows.is_empty());

    std::fs::remove_file(&log).unwrap();
}

#[tokio::test]
async fn test_flat_market_never_trades() {
    let log = temp_log();
    let feed = MockFeed::new();
    feed.set_market("BTC-USD", vec![dec!(100); 21], dec!(100));
    let mut engine =
        TradingEngine::from_config(&config(&["BTC-USD"], &log), Box::new(feed)).unwrap();

    for minute in 0..5 {
        let report = engine.tick(t0() + Duration::minutes(minute)).await.unwrap();
        assert_eq!(report.decision.action, Action::Hold);
        assert!(report.fill.is_none());
    }
    assert_eq!(engine.state().trade_count, 0);

    std::fs::remove_file(&log).unwrap();
}

#[tokio::test]
async fn test_custom_starting_balance() {
    let log = temp_log();
    let mut cfg = config(&["ETH-USD"], &log);
    cfg.trading.starting_balance = dec!(500);
    let mut engine = TradingEngine::from_config(&cfg, Box::new(feed())).unwrap();

    let report = engine.tick(t0()).await.unwrap();
    assert_eq!(report.fill.unwrap().usd_amount, dec!(100));
    assert_eq!(engine.state().usd_balance, dec!(400));
    // 0.90909091 ETH marked at 110 rounds back to the starting balance.
    assert!((report.valuation.value - dec!(500)).abs() < dec!(0.000001));

    std::fs::remove_file(&log).unwrap();
}

#[tokio::test]
async fn test_daily_summary_schedule() {
    let log = temp_log();
    let mut engine =
        TradingEngine::from_config(&config(&["ETH-USD"], &log), Box::new(feed())).unwrap();

    let first = engine.tick(t0()).await.unwrap();
    let summary = first.summary.expect("summary on the first tick");
    assert_eq!(summary.trade_count, 1);
    let text = summary.to_string();
    assert!(text.contains("DAILY SUMMARY - 2024-03-01"));
    assert!(text.contains("Current Position: ETH-USD"));

    let same_day = engine.tick(t0() + Duration::hours(14)).await.unwrap();
    assert!(same_day.summary.is_none());

    let next_day = engine.tick(t0() + Duration::hours(15)).await.unwrap();
    assert!(next_day.summary.is_some());

    std::fs::remove_file(&log).unwrap();
}

#[test]
fn test_reopened_history_keeps_rows() {
    let log = temp_log();
    let feed = feed();

    {
        let mut engine =
            TradingEngine::from_config(&config(&["ETH-USD"], &log), Box::new(feed.clone()))
                .unwrap();
        tokio_test::block_on(engine.tick(t0())).unwrap();
    }

    // A second run appends to the same file.
    let mut engine =
        TradingEngine::from_config(&config(&["ETH-USD"], &log), Box::new(feed.clone())).unwrap();
    tokio_test::block_on(engine.tick(t0())).unwrap();

    let (header, rows) = history(&log);
    assert_eq!(header.len(), 9);
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r[2] == "BUY"));
    assert_eq!(
        feed.candle_requests(),
        vec![(Pair::from("ETH-USD"), 60), (Pair::from("ETH-USD"), 60)]
    );

    std::fs::remove_file(&log).unwrap();
}

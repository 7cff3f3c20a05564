//! Paper Trader: simulated multi-pair crypto trading loop
//!
//! Entry point. Loads configuration, initialises structured logging,
//! opens the trade history and runs the scan→decide→trade loop until
//! Ctrl+C, then prints a final summary.

use anyhow::Result;
use chrono::Utc;
use std::time::Duration;
use tracing::{error, info};

use paper_trader::config;
use paper_trader::engine::{TickReport, TradingEngine};
use paper_trader::market::coinbase::CoinbaseClient;
use paper_trader::market::MarketDataSource;
use paper_trader::types::Pair;

const BANNER: &str = r#"
============================================================
PAPER TRADING BOT - 100% SIMULATED
============================================================
This bot ONLY simulates trades - it does NOT:
  - Access your real Coinbase account
  - Use any real money
  - Place actual trades
  + Only fetches public market prices
  + Simulates trades in memory
============================================================
"#;

/// Ranked pairs echoed to stdout after each scan.
const TOP_N_PRINTED: usize = 3;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Initialise structured logging
    init_logging();

    // Load configuration from TOML, then the environment override
    let mut cfg = config::AppConfig::load("config.toml")?;
    cfg.apply_env();

    println!("{BANNER}");

    // -- Initialise components -------------------------------------------

    let source = CoinbaseClient::new(
        &cfg.market.api_base_url,
        cfg.trading.candle_granularity_secs,
        cfg.market.request_timeout_secs,
    )?;
    info!(
        source = source.name(),
        base_url = %cfg.market.api_base_url,
        "Market data source ready"
    );

    let mut engine = TradingEngine::from_config(&cfg, Box::new(source))?;

    let watching = watchlist_line(engine.watchlist());
    println!(
        "[INIT] Multi-crypto scanner starting with balance ${}",
        engine.state().usd_balance
    );
    println!("Watching {} pairs: {watching}", engine.watchlist().len());
    println!(
        "Trade history will be logged to: {}",
        engine.trade_log().path().display()
    );
    println!("You can track performance over time in this file.\n");

    info!(
        starting_balance = format!("${:.2}", cfg.trading.starting_balance),
        pairs = engine.watchlist().len(),
        interval_secs = cfg.trading.poll_interval_secs,
        "Paper trader starting up"
    );

    // -- Main loop -------------------------------------------------------

    let poll_interval = Duration::from_secs(cfg.trading.poll_interval_secs);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!("Entering main loop. Press Ctrl+C to stop.");

    loop {
        match engine.tick(Utc::now()).await {
            Ok(report) => print_tick(&report),
            Err(e) => error!(error = %e, "Tick failed, continuing to next"),
        }

        tokio::select! {
            _ = tokio::time::sleep(poll_interval) => {}
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    println!("\n{}\n", engine.summary(Utc::now()));
    let valuation = engine.valuation();
    info!(
        value = format!("${:.2}", valuation.value),
        pnl = format!("${:.2}", valuation.profit_loss),
        trades = engine.state().trade_count,
        "Paper trader shut down cleanly."
    );

    Ok(())
}

/// Echo a tick to stdout: top opportunities, any fill, and the daily
/// summary when one is due.
fn print_tick(report: &TickReport) {
    if report.opportunities.is_empty() {
        println!("\nSCANNER: No opportunities this scan");
    } else {
        println!("\nSCANNER: Top {TOP_N_PRINTED} opportunities:");
        for (i, opp) in report.opportunities.iter().take(TOP_N_PRINTED).enumerate() {
            println!("  {}. {opp}", i + 1);
        }
    }

    match (&report.subject, &report.fill) {
        (_, Some(fill)) => println!("TRADE: {fill}"),
        (Some(pair), None) => println!(
            "{pair}: {} ({})",
            report.decision.action, report.decision.reason
        ),
        (None, None) => println!("{} ({})", report.decision.action, report.decision.reason),
    }
    println!(
        "Portfolio: ${:.2} (P/L ${:.2})",
        report.valuation.value, report.valuation.profit_loss
    );

    if let Some(summary) = &report.summary {
        println!("\n{summary}\n");
    }
}

fn watchlist_line(pairs: &[Pair]) -> String {
    pairs.iter().map(Pair::as_str).collect::<Vec<_>>().join(", ")
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("paper_trader=info"));

    let json_logging = std::env::var("PAPER_TRADER_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}

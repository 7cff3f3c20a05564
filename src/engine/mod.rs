//! Core engine: the scan → decide → trade loop.
//!
//! One `tick` scans the watchlist, picks the pair to act on, asks the
//! decision engine for an action, applies it to the paper portfolio and
//! records the fill. The binary drives ticks on a fixed interval.

pub mod accountant;
pub mod executor;
pub mod scanner;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::info;

use crate::config::AppConfig;
use crate::indicators::IndicatorSet;
use crate::market::MarketDataSource;
use crate::storage::TradeLog;
use crate::strategy::{Decision, DecisionEngine, DecisionReason};
use crate::types::{Opportunity, Pair, PortfolioState};

use accountant::{Accountant, DailySummary, SummarySchedule, Valuation};
use executor::{Execution, Fill, PaperExecutor};
use scanner::OpportunityScanner;

/// What happened during one tick.
#[derive(Debug, Clone)]
pub struct TickReport {
    /// Scored pairs, best first.
    pub opportunities: Vec<Opportunity>,
    /// Top-ranked pair, if anything scored.
    pub best: Option<Pair>,
    /// Pair the decision was made for.
    pub subject: Option<Pair>,
    pub decision: Decision,
    pub fill: Option<Fill>,
    /// Portfolio marked after the tick.
    pub valuation: Valuation,
    /// Present once per UTC day.
    pub summary: Option<DailySummary>,
}

pub struct TradingEngine {
    scanner: OpportunityScanner,
    decision: DecisionEngine,
    executor: PaperExecutor,
    trade_log: TradeLog,
    state: PortfolioState,
    schedule: SummarySchedule,
    /// Last observed price of the held pair.
    mark_price: Option<Decimal>,
}

impl TradingEngine {
    pub fn new(
        scanner: OpportunityScanner,
        decision: DecisionEngine,
        executor: PaperExecutor,
        trade_log: TradeLog,
        state: PortfolioState,
    ) -> Self {
        Self {
            scanner,
            decision,
            executor,
            trade_log,
            state,
            schedule: SummarySchedule::new(),
            mark_price: None,
        }
    }

    /// Wire up every component from configuration, starting all-USD.
    pub fn from_config(cfg: &AppConfig, source: Box<dyn MarketDataSource>) -> Result<Self> {
        let scanner = OpportunityScanner::new(
            source,
            cfg.watchlist.clone(),
            cfg.trading.candle_lookback,
            cfg.strategy.clone(),
        );
        let decision = DecisionEngine::new(cfg.strategy.clone(), cfg.execution.limits.clone());
        let executor = PaperExecutor::new(cfg.execution.clone());
        let trade_log = TradeLog::open(&cfg.trading.trade_log_path)?;
        let state = PortfolioState::new(cfg.trading.starting_balance);

        Ok(Self::new(scanner, decision, executor, trade_log, state))
    }

    pub fn state(&self) -> &PortfolioState {
        &self.state
    }

    pub fn watchlist(&self) -> &[Pair] {
        self.scanner.watchlist()
    }

    pub fn trade_log(&self) -> &TradeLog {
        &self.trade_log
    }

    /// Price used to value the crypto side: the held pair's latest quote,
    /// falling back to the entry price.
    pub fn mark_price(&self) -> Decimal {
        if self.state.current_position.is_none() {
            return Decimal::ZERO;
        }
        self.mark_price
            .or(self.state.entry_price)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn valuation(&self) -> Valuation {
        Accountant::valuation(&self.state, self.mark_price())
    }

    pub fn summary(&self, now: DateTime<Utc>) -> DailySummary {
        DailySummary::build(&self.state, self.mark_price(), self.scanner.watchlist(), now)
    }

    /// Run one scan → decide → execute cycle.
    ///
    /// Only a trade-log write failure is an error; the fill it belongs to
    /// has already been applied to the portfolio.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> Result<TickReport> {
        let opportunities = self.scanner.scan().await;
        let best = opportunities.first().map(|o| o.pair.clone());

        // While a position is open only the held pair is traded.
        let subject = match &self.state.current_position {
            Some(held) => opportunities.iter().find(|o| &o.pair == held),
            None => opportunities.first(),
        };

        let mut record = None;
        let (decision, fill) = match subject {
            Some(opp) => {
                if self.state.current_position.as_ref() == Some(&opp.pair) {
                    self.mark_price = Some(opp.price);
                }

                let indicators = IndicatorSet::compute(&opp.closes, self.decision.params());
                let decision = self.decision.decide(&self.state, opp.price, &indicators);
                info!(
                    pair = %opp.pair,
                    price = %opp.price,
                    action = %decision.action,
                    reason = %decision.reason,
                    "Decision"
                );

                let fill = match self.executor.execute(&self.state, decision.action, &opp.pair, opp.price) {
                    Some(Execution { state, fill }) => {
                        record = Some(Accountant::trade_record(&state, &fill, now));
                        self.state = state;
                        self.mark_price = self.state.current_position.as_ref().map(|_| fill.price);
                        Some(fill)
                    }
                    None => None,
                };
                (decision, fill)
            }
            None => {
                info!(
                    position = ?self.state.current_position.as_ref().map(Pair::as_str),
                    "Nothing to act on this tick"
                );
                (Decision::hold(DecisionReason::NoOpportunity), None)
            }
        };

        if let Some(record) = &record {
            self.trade_log.append(record)?;
        }

        let valuation = self.valuation();
        info!(
            value = format!("${:.2}", valuation.value),
            pnl = format!("${:.2}", valuation.profit_loss),
            state = %self.state,
            "Tick complete"
        );

        let summary = self.schedule.due(now).then(|| self.summary(now));

        Ok(TickReport {
            best,
            subject: subject.map(|o| o.pair.clone()),
            opportunities,
            decision,
            fill,
            valuation,
            summary,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Integration tests: full ticks through `TradingEngine` against an
//! in-memory market feed.

mod mock_feed;
mod simulation;

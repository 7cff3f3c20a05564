//! Paper Trader: simulated multi-pair crypto trading loop.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod market;
pub mod indicators;
pub mod strategy;
pub mod engine;
pub mod storage;

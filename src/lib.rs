//! market-dash: personal market dashboard
//!
//! This library provides the core components for:
//! - Polling quotes from Yahoo Finance (or a simulated walk)
//! - Aggregating ticks into 5-minute OHLC bars
//! - Storing bars in SQLite
//! - Rolling-statistics risk scoring
//! - Rate-limited LLM market summaries
//! - REST API and browser dashboard
//! - Structured logging and Prometheus metrics

pub mod ai;
pub mod api;
pub mod cli;
pub mod config;
pub mod feed;
pub mod indicators;
pub mod kline;
pub mod risk;
pub mod storage;
pub mod telemetry;

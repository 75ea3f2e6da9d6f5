//! K-line module
//!
//! Turns polled ticks into fixed-interval OHLC bars and persists them

mod aggregator;
mod collector;
mod history;
mod types;

pub use aggregator::BarAggregator;
pub use collector::{CollectorStats, KlineCollector};
pub use history::{fill_history, FillReport, FillSource};
pub use types::{bucket_start, Bar};

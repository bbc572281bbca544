//! Time-bucketed OHLCV aggregation (SPEC_FULL.md §4.8).

mod aggregator;
mod service;

pub use aggregator::CandleAggregator;
pub use service::CandleService;

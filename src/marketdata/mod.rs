//! Live session quotes (SPEC_FULL.md §4.9).

mod quote;
mod service;

pub use quote::LiveQuoteCell;
pub use service::MarketDataService;

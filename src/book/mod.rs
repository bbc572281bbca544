//! Price-time CLOB (SPEC_FULL.md §4.1, §4.2).

mod level;
mod matching;
mod orderbook;

pub use level::Level;
pub use matching::{MatchOutcome, MatchingEngine};
pub use orderbook::{FixReport, OrderBook, PriceLevelSnapshot, Snapshot};

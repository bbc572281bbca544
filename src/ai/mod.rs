//! The AI trading loop (SPEC_FULL.md §4.10).

mod decision;
mod service;

pub use decision::{daily_seed, Decision, DecisionInputs};
pub use service::AiTradeService;

//! Re-exports the commonly used types and traits, for
//! `use synth_exchange_core::prelude::*;`.

pub use crate::ai::{AiTradeService, Decision};
pub use crate::book::{MatchingEngine, OrderBook, Snapshot};
pub use crate::cache::OrderBookCache;
pub use crate::candles::{CandleAggregator, CandleService};
pub use crate::catalog::StockCatalog;
pub use crate::clock::{Clock, FixedClock, SystemClock};
pub use crate::config::EngineConfig;
pub use crate::error::{ExecutionError, OrderBookError, SettlementError, ValidationError};
pub use crate::execution::{OrderExecutionService, OrderResult, ResultStatus};
pub use crate::ids::{AiUserId, FundId, OrderId, PositionId, StockId, TransactionId, UserId};
pub use crate::marketdata::MarketDataService;
pub use crate::model::{
    AiUser, Candle, CandleResolution, Currency, Fund, LiveQuote, Order, OrderSide, OrderStatus, OrderType, Position,
    Stock, Transaction,
};
pub use crate::persistence::{InMemoryStore, Persistence};
pub use crate::settlement::SettlementEngine;
pub use crate::validation::OrderValidator;

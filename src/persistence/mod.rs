//! External collaborator interface (SPEC_FULL.md §6).
//!
//! The core never talks to a concrete database; it depends on this trait
//! only, stored as `Arc<dyn Persistence>`. Production implementations (a
//! relational store) live outside this crate.
//!
//! `run_in_transaction` takes a concrete batch of writes rather than an
//! arbitrary closure: `async_trait` objects cannot soundly accept a
//! higher-ranked `FnOnce` that itself calls back into async trait methods,
//! so the unit-of-work is expressed as data (`TransactionBatch`) and the
//! implementation is responsible for applying it atomically.

mod memory;

pub use memory::InMemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::ids::{FundId, OrderId, PositionId, StockId, TransactionId, UserId};
use crate::model::{Candle, CandleResolution, Currency, Fund, Order, Position, Stock, Transaction};

#[derive(Debug, thiserror::Error, Clone)]
#[error("persistence error: {0}")]
pub struct PersistenceError(pub String);

pub type PersistResult<T> = Result<T, PersistenceError>;

/// A group of writes that must commit all-or-nothing (SPEC_FULL.md §4.4's
/// `RunInTransaction` requirement over Orders/Transactions/Funds/Positions).
#[derive(Debug, Default, Clone)]
pub struct TransactionBatch {
    pub upsert_orders: Vec<Order>,
    pub insert_transactions: Vec<Transaction>,
    pub upsert_funds: Vec<Fund>,
    pub upsert_positions: Vec<Position>,
    pub upsert_candles: Vec<Candle>,
}

impl TransactionBatch {
    pub fn is_empty(&self) -> bool {
        self.upsert_orders.is_empty()
            && self.insert_transactions.is_empty()
            && self.upsert_funds.is_empty()
            && self.upsert_positions.is_empty()
            && self.upsert_candles.is_empty()
    }
}

#[async_trait]
pub trait Persistence: Send + Sync {
    async fn get_stock(&self, id: StockId) -> PersistResult<Option<Stock>>;
    async fn list_stocks(&self) -> PersistResult<Vec<Stock>>;

    async fn get_fund(&self, user_id: UserId, currency: Currency) -> PersistResult<Option<Fund>>;
    async fn get_position(&self, user_id: UserId, stock_id: StockId) -> PersistResult<Option<Position>>;

    async fn next_fund_id(&self) -> PersistResult<FundId>;
    async fn next_position_id(&self) -> PersistResult<PositionId>;
    async fn next_transaction_id(&self) -> PersistResult<TransactionId>;
    async fn next_order_id(&self) -> PersistResult<OrderId>;

    async fn get_open_limit_orders(
        &self,
        stock_id: StockId,
        currency: Currency,
    ) -> PersistResult<Vec<Order>>;

    async fn get_order(&self, order_id: OrderId) -> PersistResult<Option<Order>>;

    async fn get_transactions_in_range(
        &self,
        stock_id: StockId,
        currency: Currency,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> PersistResult<Vec<Transaction>>;

    async fn get_candles_in_range(
        &self,
        stock_id: StockId,
        currency: Currency,
        resolution: CandleResolution,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> PersistResult<Vec<Candle>>;

    /// Applies `batch` atomically: either every write lands, or none does.
    async fn run_in_transaction(&self, batch: TransactionBatch) -> PersistResult<()>;
}

//! `InMemoryStore`: the `Persistence` test double used by the scenario
//! tests in `tests/` (SPEC_FULL.md §10). Not a production persistence
//! layer.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::ids::{FundId, IdGenerator, OrderId, PositionId, StockId, TransactionId, UserId};
use crate::model::{Candle, CandleResolution, Currency, Fund, Order, OrderStatus, Position, Stock, Transaction};

use super::{PersistResult, Persistence, PersistenceError, TransactionBatch};

#[derive(Debug, Default)]
struct Inner {
    stocks: HashMap<StockId, Stock>,
    funds: HashMap<(UserId, Currency), Fund>,
    positions: HashMap<(UserId, StockId), Position>,
    orders: HashMap<OrderId, Order>,
    transactions: Vec<Transaction>,
    candles: HashMap<(StockId, Currency, CandleResolution, DateTime<Utc>), Candle>,
}

#[derive(Debug)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
    fund_ids: IdGenerator,
    position_ids: IdGenerator,
    transaction_ids: IdGenerator,
    order_ids: IdGenerator,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            fund_ids: IdGenerator::default(),
            position_ids: IdGenerator::default(),
            transaction_ids: IdGenerator::default(),
            order_ids: IdGenerator::default(),
        }
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_stock(&self, stock: Stock) {
        self.inner.lock().stocks.insert(stock.id, stock);
    }

    pub fn seed_fund(&self, fund: Fund) {
        self.inner.lock().funds.insert((fund.user_id, fund.currency), fund);
    }

    pub fn seed_position(&self, position: Position) {
        self.inner
            .lock()
            .positions
            .insert((position.user_id, position.stock_id), position);
    }
}

#[async_trait]
impl Persistence for InMemoryStore {
    async fn get_stock(&self, id: StockId) -> PersistResult<Option<Stock>> {
        Ok(self.inner.lock().stocks.get(&id).cloned())
    }

    async fn list_stocks(&self) -> PersistResult<Vec<Stock>> {
        Ok(self.inner.lock().stocks.values().cloned().collect())
    }

    async fn get_fund(&self, user_id: UserId, currency: Currency) -> PersistResult<Option<Fund>> {
        Ok(self.inner.lock().funds.get(&(user_id, currency)).cloned())
    }

    async fn get_position(&self, user_id: UserId, stock_id: StockId) -> PersistResult<Option<Position>> {
        Ok(self.inner.lock().positions.get(&(user_id, stock_id)).cloned())
    }

    async fn next_fund_id(&self) -> PersistResult<FundId> {
        Ok(FundId(self.fund_ids.next_raw()))
    }

    async fn next_position_id(&self) -> PersistResult<PositionId> {
        Ok(PositionId(self.position_ids.next_raw()))
    }

    async fn next_transaction_id(&self) -> PersistResult<TransactionId> {
        Ok(TransactionId(self.transaction_ids.next_raw()))
    }

    async fn next_order_id(&self) -> PersistResult<OrderId> {
        Ok(OrderId(self.order_ids.next_raw()))
    }

    async fn get_open_limit_orders(
        &self,
        stock_id: StockId,
        currency: Currency,
    ) -> PersistResult<Vec<Order>> {
        Ok(self
            .inner
            .lock()
            .orders
            .values()
            .filter(|o| {
                o.stock_id == stock_id
                    && o.currency == currency
                    && o.status == OrderStatus::Open
                    && o.order_type == crate::model::OrderType::Limit
            })
            .cloned()
            .collect())
    }

    async fn get_order(&self, order_id: OrderId) -> PersistResult<Option<Order>> {
        Ok(self.inner.lock().orders.get(&order_id).cloned())
    }

    async fn get_transactions_in_range(
        &self,
        stock_id: StockId,
        currency: Currency,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> PersistResult<Vec<Transaction>> {
        Ok(self
            .inner
            .lock()
            .transactions
            .iter()
            .filter(|t| {
                t.stock_id == stock_id && t.currency == currency && t.timestamp >= from && t.timestamp < to
            })
            .cloned()
            .collect())
    }

    async fn get_candles_in_range(
        &self,
        stock_id: StockId,
        currency: Currency,
        resolution: CandleResolution,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> PersistResult<Vec<Candle>> {
        let mut out: Vec<Candle> = self
            .inner
            .lock()
            .candles
            .values()
            .filter(|c| {
                c.stock_id == stock_id
                    && c.currency == currency
                    && c.resolution == resolution
                    && c.open_time >= from
                    && c.open_time < to
            })
            .cloned()
            .collect();
        out.sort_by_key(|c| c.open_time);
        Ok(out)
    }

    async fn run_in_transaction(&self, batch: TransactionBatch) -> PersistResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut inner = self.inner.lock();
        for order in batch.upsert_orders {
            inner.orders.insert(order.id, order);
        }
        for tx in batch.insert_transactions {
            if inner.transactions.iter().any(|existing| existing.id == tx.id) {
                return Err(PersistenceError(format!("duplicate transaction id {:?}", tx.id)));
            }
            inner.transactions.push(tx);
        }
        for fund in batch.upsert_funds {
            inner.funds.insert((fund.user_id, fund.currency), fund);
        }
        for position in batch.upsert_positions {
            inner.positions.insert((position.user_id, position.stock_id), position);
        }
        for candle in batch.upsert_candles {
            inner
                .candles
                .insert((candle.stock_id, candle.currency, candle.resolution, candle.open_time), candle);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn seeded_fund_round_trips() {
        let store = InMemoryStore::new();
        let fund = Fund {
            id: FundId(1),
            user_id: UserId(1),
            currency: Currency::Usd,
            total_balance: dec!(100),
            reserved_balance: dec!(0),
        };
        store.seed_fund(fund.clone());
        let loaded = store.get_fund(UserId(1), Currency::Usd).await.unwrap().unwrap();
        assert_eq!(loaded, fund);
    }

    #[tokio::test]
    async fn transaction_batch_rejects_duplicate_transaction_ids() {
        let store = InMemoryStore::new();
        let tx = Transaction {
            id: TransactionId(1),
            stock_id: StockId(1),
            currency: Currency::Usd,
            buy_order_id: OrderId(1),
            sell_order_id: OrderId(2),
            buyer_id: UserId(1),
            seller_id: UserId(2),
            price: dec!(10),
            quantity: 1,
            timestamp: Utc::now(),
        };
        let mut batch = TransactionBatch::default();
        batch.insert_transactions.push(tx.clone());
        store.run_in_transaction(batch.clone()).await.unwrap();
        assert!(store.run_in_transaction(batch).await.is_err());
    }
}

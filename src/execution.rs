//! `OrderExecutionService` (SPEC_FULL.md §4.3): the umbrella entry point
//! that sequences validate → reserve → match → settle → publish under the
//! per-book gate.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::cache::OrderBookCache;
use crate::catalog::StockCatalog;
use crate::clock::Clock;
use crate::error::ExecutionError;
use crate::ids::{OrderId, StockId, TransactionId, UserId};
use crate::model::{Currency, Order, OrderSide, OrderStatus, OrderType, Transaction};
use crate::persistence::Persistence;
use crate::settlement::SettlementEngine;
use crate::validation::OrderValidator;

/// The outcome of `place_and_match`/`cancel`/`modify`, mirroring
/// SPEC_FULL.md §6's `OrderResult.Status` taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultStatus {
    PlacedOnBook,
    PartialFill,
    Filled,
    Cancelled,
    NoLiquidity,
    AlreadyClosed,
    InvalidParameters,
}

#[derive(Debug, Clone)]
pub struct OrderResult {
    pub status: ResultStatus,
    pub order: Option<Order>,
    pub trades: Vec<Transaction>,
    pub message: String,
}

/// A published trade tick, handed to market-data and candle subscribers
/// outside the book lock, in match order (SPEC_FULL.md §4.3 step 4).
pub type TickListener = Arc<dyn Fn(&Transaction) + Send + Sync>;

pub struct OrderExecutionService {
    catalog: Arc<StockCatalog>,
    cache: Arc<OrderBookCache>,
    persistence: Arc<dyn Persistence>,
    settlement: SettlementEngine,
    clock: Arc<dyn Clock>,
    tick_listeners: parking_lot::Mutex<Vec<TickListener>>,
    tx_id_counter: crate::ids::IdGenerator,
}

impl OrderExecutionService {
    pub fn new(
        catalog: Arc<StockCatalog>,
        cache: Arc<OrderBookCache>,
        persistence: Arc<dyn Persistence>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            cache,
            settlement: SettlementEngine::new(persistence.clone()),
            persistence,
            clock,
            tick_listeners: parking_lot::Mutex::new(Vec::new()),
            tx_id_counter: crate::ids::IdGenerator::default(),
        }
    }

    pub fn on_tick(&self, listener: TickListener) {
        self.tick_listeners.lock().push(listener);
    }

    fn publish(&self, trades: &[Transaction]) {
        let listeners = self.tick_listeners.lock();
        for trade in trades {
            for listener in listeners.iter() {
                listener(trade);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    #[instrument(skip(self, token))]
    pub async fn place_and_match(
        &self,
        user_id: UserId,
        stock_id: StockId,
        currency: &str,
        side: OrderSide,
        order_type: OrderType,
        price: Decimal,
        slippage_percent: Decimal,
        quantity: u64,
        buy_budget: Option<Decimal>,
        token: &CancellationToken,
    ) -> Result<OrderResult, ExecutionError> {
        if token.is_cancelled() {
            return Err(ExecutionError::Cancelled);
        }

        let validator = OrderValidator::new(&self.catalog);
        let currency = match validator.validate_input(user_id, stock_id, currency, quantity) {
            Ok(c) => c,
            Err(e) => {
                return Ok(OrderResult {
                    status: ResultStatus::InvalidParameters,
                    order: None,
                    trades: vec![],
                    message: e.to_string(),
                });
            }
        };

        let now = self.clock.now_utc();
        let draft = Order {
            id: OrderId(0),
            user_id,
            stock_id,
            currency,
            side,
            order_type,
            price,
            slippage_percent,
            quantity,
            amount_filled: 0,
            status: OrderStatus::Open,
            buy_budget,
            created_at: now,
            updated_at: now,
        };
        if let Err(e) = validator.validate_new(&draft) {
            return Ok(OrderResult {
                status: ResultStatus::InvalidParameters,
                order: None,
                trades: vec![],
                message: e.to_string(),
            });
        }

        let reserved = match self.settlement.reserve_and_persist(draft).await {
            Ok(order) => order,
            Err(e) => {
                return Ok(OrderResult {
                    status: ResultStatus::InvalidParameters,
                    order: None,
                    trades: vec![],
                    message: e.to_string(),
                });
            }
        };

        if token.is_cancelled() {
            return Err(ExecutionError::Cancelled);
        }

        let persistence = self.persistence.clone();
        let (mut taker, trades) = self
            .cache
            .with_book_lock(stock_id, currency, persistence.as_ref(), {
                let reserved = reserved.clone();
                |book| async move {
                    let mut taker = reserved;
                    let mut id_gen = || TransactionId(self.tx_id_counter.next_raw());
                    let outcome =
                        crate::book::MatchingEngine::match_order(&mut taker, &book, &mut id_gen, now);
                    for trade in &outcome.trades {
                        let (buy_order, sell_order) = self.orders_for_trade(trade, &taker).await;
                        let _ = self.settlement.settle_trade(trade, &buy_order, &sell_order).await;
                    }
                    if taker.status == OrderStatus::Open {
                        if taker.is_open_limit() {
                            let _ = book.upsert_order(taker.clone());
                        } else {
                            let mut remainder = taker.clone();
                            let _ = self.settlement.cancel_remainder(&mut remainder, now).await;
                            taker = remainder;
                        }
                    }
                    (taker, outcome.trades)
                }
            })
            .await
            .map_err(|e| ExecutionError::Settlement(crate::error::SettlementError::Persistence(e.0)))?;

        self.publish(&trades);

        let status = if taker.status == OrderStatus::Filled {
            ResultStatus::Filled
        } else if !trades.is_empty() {
            ResultStatus::PartialFill
        } else if taker.is_open_limit() {
            ResultStatus::PlacedOnBook
        } else {
            ResultStatus::NoLiquidity
        };
        taker.updated_at = now;
        info!(order_id = taker.id.get(), ?status, trades = trades.len(), "place_and_match complete");

        Ok(OrderResult {
            status,
            order: Some(taker),
            trades,
            message: String::new(),
        })
    }

    /// Loads the current persisted state of both sides of `trade`, falling
    /// back to `taker` for whichever side it is (its freshest in-memory
    /// copy, not yet persisted mid-match).
    async fn orders_for_trade(&self, trade: &Transaction, taker: &Order) -> (Order, Order) {
        let buy = if taker.id == trade.buy_order_id {
            taker.clone()
        } else {
            self.persistence
                .get_order(trade.buy_order_id)
                .await
                .ok()
                .flatten()
                .expect("maker order must exist")
        };
        let sell = if taker.id == trade.sell_order_id {
            taker.clone()
        } else {
            self.persistence
                .get_order(trade.sell_order_id)
                .await
                .ok()
                .flatten()
                .expect("maker order must exist")
        };
        (buy, sell)
    }

    #[instrument(skip(self, token))]
    pub async fn cancel(&self, order_id: OrderId, token: &CancellationToken) -> Result<OrderResult, ExecutionError> {
        if token.is_cancelled() {
            return Err(ExecutionError::Cancelled);
        }
        let Some(mut order) = self
            .persistence
            .get_order(order_id)
            .await
            .map_err(|e| ExecutionError::Settlement(crate::error::SettlementError::Persistence(e.0)))?
        else {
            return Err(ExecutionError::AlreadyClosed(order_id));
        };
        if order.status != OrderStatus::Open {
            return Ok(OrderResult {
                status: ResultStatus::AlreadyClosed,
                order: Some(order),
                trades: vec![],
                message: "order already closed".into(),
            });
        }

        let persistence = self.persistence.clone();
        self.cache
            .with_book_lock(order.stock_id, order.currency, persistence.as_ref(), |book| {
                let order_id = order.id;
                async move {
                    book.remove_by_id(order_id);
                }
            })
            .await
            .map_err(|e| ExecutionError::Settlement(crate::error::SettlementError::Persistence(e.0)))?;

        let now = self.clock.now_utc();
        self.settlement
            .cancel_remainder(&mut order, now)
            .await
            .map_err(ExecutionError::Settlement)?;

        Ok(OrderResult {
            status: ResultStatus::Cancelled,
            order: Some(order),
            trades: vec![],
            message: String::new(),
        })
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now_utc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::model::{Fund, Stock};
    use crate::persistence::InMemoryStore;
    use rust_decimal_macros::dec;

    fn setup() -> (Arc<StockCatalog>, Arc<OrderBookCache>, Arc<InMemoryStore>, Arc<dyn Clock>) {
        let catalog = Arc::new(StockCatalog::new());
        catalog.upsert(Stock {
            id: StockId(1),
            symbol: "ACME".into(),
            company_name: "Acme".into(),
        });
        let cache = Arc::new(OrderBookCache::new());
        let store = Arc::new(InMemoryStore::new());
        let clock: Arc<dyn Clock> = Arc::new(FixedClock(Utc::now()));
        (catalog, cache, store, clock)
    }

    #[tokio::test]
    async fn placing_a_buy_with_no_liquidity_rests_on_book() {
        let (catalog, cache, store, clock) = setup();
        let mut fund = Fund::new(crate::ids::FundId(1), UserId(1), Currency::Usd);
        fund.total_balance = dec!(1000);
        store.seed_fund(fund);
        let svc = OrderExecutionService::new(catalog, cache, store, clock);
        let token = CancellationToken::new();
        let result = svc
            .place_and_match(
                UserId(1),
                StockId(1),
                "USD",
                OrderSide::Buy,
                OrderType::Limit,
                dec!(10),
                Decimal::ZERO,
                5,
                None,
                &token,
            )
            .await
            .unwrap();
        assert_eq!(result.status, ResultStatus::PlacedOnBook);
    }
}

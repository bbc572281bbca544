//! `OrderBookCache` (SPEC_FULL.md §4.6): lazy book loading plus the
//! per-(stock, currency) exclusive "book gate" that serializes matching and
//! settlement (SPEC_FULL.md §5).

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex as AsyncMutex;
use tracing::info;

use crate::book::OrderBook;
use crate::ids::StockId;
use crate::model::Currency;
use crate::persistence::{PersistResult, Persistence};

type BookKey = (StockId, Currency);

struct Slot {
    book: Arc<OrderBook>,
    gate: AsyncMutex<()>,
}

/// Holds every loaded book and the per-key gate that order execution must
/// acquire before touching it. Distinct keys never block each other.
#[derive(Default)]
pub struct OrderBookCache {
    slots: DashMap<BookKey, Arc<Slot>>,
}

impl OrderBookCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, stock_id: StockId, currency: Currency) -> Arc<Slot> {
        self.slots
            .entry((stock_id, currency))
            .or_insert_with(|| {
                Arc::new(Slot {
                    book: Arc::new(OrderBook::new(stock_id, currency)),
                    gate: AsyncMutex::new(()),
                })
            })
            .clone()
    }

    /// Ensures the book for `(stock_id, currency)` is loaded from open
    /// limit orders in `persistence`, then returns it. Idempotent: a
    /// second call against an already-loaded key is a cheap lookup.
    pub async fn get_or_load(
        &self,
        stock_id: StockId,
        currency: Currency,
        persistence: &dyn Persistence,
    ) -> PersistResult<Arc<OrderBook>> {
        let first_time = !self.slots.contains_key(&(stock_id, currency));
        let slot = self.slot(stock_id, currency);
        if first_time {
            let orders = persistence.get_open_limit_orders(stock_id, currency).await?;
            info!(stock_id = stock_id.get(), %currency, count = orders.len(), "loaded book from persistence");
            for order in orders {
                let _ = slot.book.upsert_order(order);
            }
        }
        Ok(slot.book.clone())
    }

    /// Acquires the per-(stock, currency) gate and runs `body` with
    /// exclusive access to that book. The gate is a `tokio::sync::Mutex`
    /// so it may be awaited; the book's own internal mutex is never held
    /// across this await.
    pub async fn with_book_lock<F, Fut, T>(
        &self,
        stock_id: StockId,
        currency: Currency,
        persistence: &dyn Persistence,
        body: F,
    ) -> PersistResult<T>
    where
        F: FnOnce(Arc<OrderBook>) -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        let slot = self.slot(stock_id, currency);
        let _permit = slot.gate.lock().await;
        let book = self.get_or_load(stock_id, currency, persistence).await?;
        Ok(body(book).await)
    }

    pub fn loaded_keys(&self) -> Vec<BookKey> {
        self.slots.iter().map(|entry| *entry.key()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::InMemoryStore;

    #[tokio::test]
    async fn distinct_keys_load_independently() {
        let cache = OrderBookCache::new();
        let store = InMemoryStore::new();
        let book_a = cache.get_or_load(StockId(1), Currency::Usd, &store).await.unwrap();
        let book_b = cache.get_or_load(StockId(2), Currency::Usd, &store).await.unwrap();
        assert_eq!(book_a.stock_id, StockId(1));
        assert_eq!(book_b.stock_id, StockId(2));
        assert_eq!(cache.loaded_keys().len(), 2);
    }

    #[tokio::test]
    async fn with_book_lock_serializes_same_key() {
        let cache = Arc::new(OrderBookCache::new());
        let store = Arc::new(InMemoryStore::new());
        let order_of_execution = Arc::new(tokio::sync::Mutex::new(Vec::<u8>::new()));

        let mut handles = Vec::new();
        for i in 0..5u8 {
            let cache = cache.clone();
            let store = store.clone();
            let order_of_execution = order_of_execution.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .with_book_lock(StockId(1), Currency::Usd, &*store, |_book| async move {
                        order_of_execution.lock().await.push(i);
                    })
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(order_of_execution.lock().await.len(), 5);
    }
}

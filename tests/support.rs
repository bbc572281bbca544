use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use synth_exchange_core::prelude::*;

pub struct Harness {
    pub catalog: Arc<StockCatalog>,
    pub cache: Arc<OrderBookCache>,
    pub store: Arc<InMemoryStore>,
    pub execution: Arc<OrderExecutionService>,
}

pub fn build_harness() -> Harness {
    let catalog = Arc::new(StockCatalog::new());
    catalog.upsert(Stock {
        id: StockId(1),
        symbol: "ACME".into(),
        company_name: "Acme Corp".into(),
    });
    let cache = Arc::new(OrderBookCache::new());
    let store = Arc::new(InMemoryStore::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let execution = Arc::new(OrderExecutionService::new(
        catalog.clone(),
        cache.clone(),
        store.clone(),
        clock,
    ));
    Harness {
        catalog,
        cache,
        store,
        execution,
    }
}

pub fn fund_with_balance(user_id: UserId, id: i64, balance: Decimal) -> Fund {
    let mut fund = Fund::new(FundId(id), user_id, Currency::Usd);
    fund.total_balance = balance;
    fund
}

pub fn position_with_quantity(user_id: UserId, stock_id: StockId, id: i64, quantity: u64) -> Position {
    let mut position = Position::new(PositionId(id), user_id, stock_id);
    position.quantity = quantity;
    position
}

pub fn now() -> chrono::DateTime<Utc> {
    Utc::now()
}

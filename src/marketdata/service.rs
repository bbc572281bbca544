use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::ids::StockId;
use crate::model::{Currency, LiveQuote, Transaction};

use super::quote::LiveQuoteCell;

type QuoteKey = (StockId, Currency);

/// One recent-tick record kept in the ring buffer for historical bootstrap.
#[derive(Debug, Clone)]
pub struct RecentTick {
    pub price: Decimal,
    pub quantity: u64,
    pub at: DateTime<Utc>,
}

type QuoteChangeListener = Arc<dyn Fn(&LiveQuote) + Send + Sync>;

/// Maintains live quotes and a bounded recent-ticks ring buffer per
/// (stock, currency) (SPEC_FULL.md §4.9).
pub struct MarketDataService {
    quotes: DashMap<QuoteKey, Arc<LiveQuoteCell>>,
    recent_ticks: DashMap<QuoteKey, Mutex<VecDeque<RecentTick>>>,
    recent_ticks_window: StdDuration,
    listeners: Mutex<Vec<QuoteChangeListener>>,
}

impl MarketDataService {
    pub fn new(recent_ticks_window: StdDuration) -> Self {
        Self {
            quotes: DashMap::new(),
            recent_ticks: DashMap::new(),
            recent_ticks_window,
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn on_quote_change(&self, listener: QuoteChangeListener) {
        self.listeners.lock().push(listener);
    }

    fn cell(&self, key: QuoteKey, session_start_utc: DateTime<Utc>) -> Arc<LiveQuoteCell> {
        self.quotes
            .entry(key)
            .or_insert_with(|| Arc::new(LiveQuoteCell::new(key.0, key.1, session_start_utc)))
            .clone()
    }

    pub fn apply_tick(&self, stock_id: StockId, currency: Currency, price: Decimal, quantity: u64, at: DateTime<Utc>) {
        let key = (stock_id, currency);
        let session_start = at.date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc();
        let cell = self.cell(key, session_start);
        cell.apply_tick(price, quantity, at);

        let ring = self.recent_ticks.entry(key).or_insert_with(|| Mutex::new(VecDeque::new()));
        let mut ring = ring.lock();
        ring.push_back(RecentTick { price, quantity, at });
        while let Some(front) = ring.front() {
            if at.signed_duration_since(front.at).to_std().unwrap_or_default() > self.recent_ticks_window {
                ring.pop_front();
            } else {
                break;
            }
        }
        drop(ring);

        let snapshot = cell.snapshot();
        for listener in self.listeners.lock().iter() {
            listener(&snapshot);
        }
    }

    pub fn apply_trade(&self, trade: &Transaction) {
        self.apply_tick(trade.stock_id, trade.currency, trade.price, trade.quantity, trade.timestamp);
    }

    pub fn get_quote(&self, stock_id: StockId, currency: Currency) -> Option<LiveQuote> {
        self.quotes.get(&(stock_id, currency)).map(|cell| cell.snapshot())
    }

    pub fn recent_ticks(&self, stock_id: StockId, currency: Currency) -> Vec<RecentTick> {
        self.recent_ticks
            .get(&(stock_id, currency))
            .map(|ring| ring.lock().iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Bootstraps quotes from historical trades, e.g. on process start
    /// before live ticks arrive.
    pub fn build_from_history(&self, trades: &[Transaction]) {
        for trade in trades {
            self.apply_trade(trade);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{OrderId, TransactionId, UserId};
    use rust_decimal_macros::dec;

    #[test]
    fn apply_tick_updates_quote_and_ring_buffer() {
        let svc = MarketDataService::new(StdDuration::from_secs(300));
        let now = Utc::now();
        svc.apply_tick(StockId(1), Currency::Usd, dec!(10), 5, now);
        let quote = svc.get_quote(StockId(1), Currency::Usd).unwrap();
        assert_eq!(quote.last_price, Some(dec!(10)));
        assert_eq!(quote.volume, 5);
        assert_eq!(svc.recent_ticks(StockId(1), Currency::Usd).len(), 1);
    }

    #[test]
    fn build_from_history_seeds_quotes() {
        let svc = MarketDataService::new(StdDuration::from_secs(300));
        let trade = Transaction {
            id: TransactionId(1),
            stock_id: StockId(1),
            currency: Currency::Usd,
            buy_order_id: OrderId(1),
            sell_order_id: OrderId(2),
            buyer_id: UserId(1),
            seller_id: UserId(2),
            price: dec!(20),
            quantity: 2,
            timestamp: Utc::now(),
        };
        svc.build_from_history(&[trade]);
        assert!(svc.get_quote(StockId(1), Currency::Usd).is_some());
    }
}

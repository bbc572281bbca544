use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::ids::StockId;
use crate::model::{Currency, LiveQuote};

/// A per-(stock, currency) quote behind its own mutex, so `apply_tick`
/// serializes per-quote rather than globally across the whole market-data
/// map (SPEC_FULL.md §5).
pub struct LiveQuoteCell {
    inner: Mutex<LiveQuote>,
}

impl LiveQuoteCell {
    pub fn new(stock_id: StockId, currency: Currency, session_start_utc: DateTime<Utc>) -> Self {
        Self {
            inner: Mutex::new(LiveQuote::new_session(stock_id, currency, session_start_utc)),
        }
    }

    pub fn snapshot(&self) -> LiveQuote {
        self.inner.lock().clone()
    }

    /// Applies one tick. `utc_time` only takes effect on `last_price`/
    /// `last_updated` if it is at least as new as the current value
    /// (monotonic latest-tick semantics, SPEC_FULL.md §4.9).
    pub fn apply_tick(&self, price: Decimal, shares: u64, utc_time: DateTime<Utc>) {
        let mut q = self.inner.lock();
        if utc_time.date_naive() != q.session_start_utc.date_naive() {
            let fresh_session_start = utc_time.date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc();
            *q = LiveQuote::new_session(q.stock_id, q.currency, fresh_session_start);
        }
        if q.open.is_none() {
            q.open = Some(price);
        }
        q.high = Some(q.high.map_or(price, |h| h.max(price)));
        q.low = Some(q.low.map_or(price, |l| l.min(price)));
        q.volume += shares;
        if q.last_updated.is_none_or(|last| utc_time >= last) {
            q.last_price = Some(price);
            q.last_updated = Some(utc_time);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    #[test]
    fn out_of_order_tick_does_not_move_last_price_backwards() {
        let cell = LiveQuoteCell::new(StockId(1), Currency::Usd, Utc::now());
        let t0 = Utc::now();
        cell.apply_tick(dec!(10), 1, t0);
        cell.apply_tick(dec!(9), 1, t0 - Duration::seconds(5));
        let snap = cell.snapshot();
        assert_eq!(snap.last_price, Some(dec!(10)));
        assert_eq!(snap.high, Some(dec!(10)));
        assert_eq!(snap.low, Some(dec!(9)));
    }
}

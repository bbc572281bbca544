//! `CandleAggregator`: one instance per (stock, currency, resolution)
//! (SPEC_FULL.md §4.8).

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use crossbeam::queue::SegQueue;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::warn;

use crate::ids::{StockId, TransactionId};
use crate::model::{Candle, CandleResolution, Currency};
use crate::util::floor_to_bucket;

struct Live {
    candle: Candle,
    seen_transactions: HashSet<TransactionId>,
}

/// Accumulates ticks into OHLCV bars. The live candle sits behind one
/// mutex; closed candles drain into a lock-free queue so the tick-ingest
/// path never blocks on whatever is consuming closed candles
/// (SPEC_FULL.md §5).
pub struct CandleAggregator {
    pub stock_id: StockId,
    pub currency: Currency,
    pub resolution: CandleResolution,
    max_gap_candles: u32,
    live: Mutex<Option<Live>>,
    closed: SegQueue<Candle>,
}

impl CandleAggregator {
    pub fn new(stock_id: StockId, currency: Currency, resolution: CandleResolution, max_gap_candles: u32) -> Self {
        Self {
            stock_id,
            currency,
            resolution,
            max_gap_candles,
            live: Mutex::new(None),
            closed: SegQueue::new(),
        }
    }

    /// Applies one trade tick (SPEC_FULL.md §4.8 `OnTick`).
    pub fn on_tick(&self, transaction_id: TransactionId, price: Decimal, quantity: u64, at: DateTime<Utc>) {
        let bucket_start = floor_to_bucket(at, self.resolution.seconds());
        let mut guard = self.live.lock();

        match guard.as_mut() {
            None => {
                let mut candle = self.fresh_candle(bucket_start, price);
                candle.apply_tick(price, quantity);
                *guard = Some(Live {
                    candle,
                    seen_transactions: HashSet::from([transaction_id]),
                });
                return;
            }
            Some(live) => {
                if bucket_start < live.candle.open_time {
                    warn!(stock_id = self.stock_id.get(), "dropped out-of-order tick");
                    return;
                }
                if bucket_start > live.candle.open_time {
                    self.roll_to(&mut guard, bucket_start, price);
                }
            }
        }

        if let Some(live) = guard.as_mut() {
            if !live.seen_transactions.insert(transaction_id) {
                return; // dedup: already applied this transaction to this candle
            }
            live.candle.apply_tick(price, quantity);
        }
    }

    fn fresh_candle(&self, open_time: DateTime<Utc>, seed_price: Decimal) -> Candle {
        Candle {
            stock_id: self.stock_id,
            currency: self.currency,
            resolution: self.resolution,
            open_time,
            open: seed_price,
            high: seed_price,
            low: seed_price,
            close: seed_price,
            volume: 0,
            trade_count: 0,
        }
    }

    /// Closes the current live candle (emitting gap candles up to the cap),
    /// and opens a new one at `new_open_time`.
    fn roll_to(&self, guard: &mut Option<Live>, new_open_time: DateTime<Utc>, seed_price: Decimal) {
        let Some(live) = guard.take() else { return };
        let last_close_price = live.candle.close;
        let bucket = self.resolution.seconds();
        self.closed.push(live.candle.clone());

        let mut gap_open = live.candle.open_time + chrono::Duration::seconds(bucket);
        let mut gaps_emitted = 0u32;
        while gap_open < new_open_time {
            if gaps_emitted >= self.max_gap_candles {
                warn!(
                    stock_id = self.stock_id.get(),
                    "gap-candle cap reached, stopping fill"
                );
                break;
            }
            self.closed.push(Candle::gap(
                self.stock_id,
                self.currency,
                self.resolution,
                gap_open,
                last_close_price,
            ));
            gaps_emitted += 1;
            gap_open += chrono::Duration::seconds(bucket);
        }

        *guard = Some(Live {
            candle: self.fresh_candle(new_open_time, seed_price),
            seen_transactions: HashSet::new(),
        });
    }

    /// Closes the live candle if its close time has elapsed.
    pub fn flush_if_elapsed(&self, now: DateTime<Utc>) {
        let mut guard = self.live.lock();
        if let Some(live) = guard.as_ref() {
            if live.candle.close_time() <= now {
                let candle = guard.take().unwrap().candle;
                self.closed.push(candle);
            }
        }
    }

    pub fn try_get_live_snapshot(&self) -> Option<Candle> {
        self.live.lock().as_ref().map(|live| live.candle.clone())
    }

    /// Drains all closed candles accumulated so far.
    pub fn drain_closed(&self) -> Vec<Candle> {
        let mut out = Vec::new();
        while let Some(candle) = self.closed.pop() {
            out.push(candle);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn candle_rolls_and_gap_fills() {
        let agg = CandleAggregator::new(StockId(1), Currency::Usd, CandleResolution::OneMinute, 10);
        let t0 = Utc.timestamp_opt(0, 0).single().unwrap();
        agg.on_tick(TransactionId(1), dec!(10), 3, t0 + chrono::Duration::seconds(10));
        agg.on_tick(TransactionId(2), dec!(12), 2, t0 + chrono::Duration::seconds(135));

        let closed = agg.drain_closed();
        assert_eq!(closed.len(), 2, "first bucket close + one gap candle");
        assert_eq!(closed[0].open, dec!(10));
        assert_eq!(closed[0].close, dec!(10));
        assert_eq!(closed[1].open, dec!(10));
        assert_eq!(closed[1].volume, 0);

        let live = agg.try_get_live_snapshot().unwrap();
        assert_eq!(live.open, dec!(12));
        assert_eq!(live.close, dec!(12));
    }

    #[test]
    fn duplicate_transaction_ids_apply_once() {
        let agg = CandleAggregator::new(StockId(1), Currency::Usd, CandleResolution::OneMinute, 10);
        let t0 = Utc.timestamp_opt(0, 0).single().unwrap();
        agg.on_tick(TransactionId(1), dec!(10), 3, t0);
        agg.on_tick(TransactionId(1), dec!(999), 3, t0);
        let live = agg.try_get_live_snapshot().unwrap();
        assert_eq!(live.trade_count, 1);
        assert_eq!(live.volume, 3);
    }
}

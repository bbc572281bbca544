use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{debug, trace, warn};

use crate::error::OrderBookError;
use crate::ids::{OrderId, StockId, UserId};
use crate::model::{Currency, Order, OrderSide, OrderStatus, OrderType};

use super::level::Level;

/// One aggregated price level in a [`Snapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceLevelSnapshot {
    pub price: Decimal,
    pub total_remaining_quantity: u64,
    pub order_count: usize,
}

/// A cheap, read-only view of both sides of a book, best price first.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub bids: Vec<PriceLevelSnapshot>,
    pub asks: Vec<PriceLevelSnapshot>,
}

/// Counts returned by [`OrderBook::fix_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixReport {
    pub removed_orphaned_index_entries: usize,
    pub removed_invalid_orders: usize,
    pub removed_empty_levels: usize,
}

impl FixReport {
    pub fn total(&self) -> usize {
        self.removed_orphaned_index_entries + self.removed_invalid_orders + self.removed_empty_levels
    }
}

struct BookInner {
    bids: BTreeMap<Decimal, Level>,
    asks: BTreeMap<Decimal, Level>,
    index: HashMap<OrderId, (OrderSide, Decimal)>,
}

impl Default for BookInner {
    fn default() -> Self {
        Self {
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            index: HashMap::new(),
        }
    }
}

impl BookInner {
    fn side_map(&mut self, side: OrderSide) -> &mut BTreeMap<Decimal, Level> {
        match side {
            OrderSide::Buy => &mut self.bids,
            OrderSide::Sell => &mut self.asks,
        }
    }

    fn side_map_ref(&self, side: OrderSide) -> &BTreeMap<Decimal, Level> {
        match side {
            OrderSide::Buy => &self.bids,
            OrderSide::Sell => &self.asks,
        }
    }

    fn remove_from_level(&mut self, side: OrderSide, price: Decimal, id: OrderId) -> Option<Order> {
        let map = self.side_map(side);
        let removed = map.get_mut(&price).and_then(|level| level.remove(id));
        if let Some(level) = map.get(&price) {
            if level.is_empty() {
                map.remove(&price);
            }
        }
        removed
    }
}

/// A price-time CLOB for a single (stock, currency) pair.
///
/// A single `parking_lot::Mutex` guards both price maps and the id index
/// for short, synchronous critical sections; it is never held across an
/// `.await` (SPEC_FULL.md §5 — a deliberate divergence from a lock-free
/// design, see `DESIGN.md`).
pub struct OrderBook {
    pub stock_id: StockId,
    pub currency: Currency,
    inner: Mutex<BookInner>,
}

impl OrderBook {
    pub fn new(stock_id: StockId, currency: Currency) -> Self {
        Self {
            stock_id,
            currency,
            inner: Mutex::new(BookInner::default()),
        }
    }

    fn guard_book(&self, order: &Order) -> Result<(), OrderBookError> {
        if order.stock_id != self.stock_id {
            return Err(OrderBookError::WrongBook {
                order_id: order.id,
                expected: self.stock_id,
            });
        }
        Ok(())
    }

    /// Inserts or updates `order` per SPEC_FULL.md §4.1's `UpsertOrder`
    /// contract: a no-longer-open-limit order is removed; a side/price
    /// change or an *increase* in remaining quantity moves the order to
    /// the tail of its (possibly new) level, losing time priority; any
    /// other in-place change rewrites the node without moving it.
    pub fn upsert_order(&self, order: Order) -> Result<(), OrderBookError> {
        self.guard_book(&order)?;
        let mut inner = self.inner.lock();
        let existing_location = inner.index.get(&order.id).copied();

        if !order.is_open_limit() {
            if let Some((side, price)) = existing_location {
                inner.remove_from_level(side, price, order.id);
                inner.index.remove(&order.id);
                debug!(order_id = order.id.get(), "removed non-open-limit order from book");
            }
            return Ok(());
        }

        match existing_location {
            None => {
                let price = order.price;
                let side = order.side;
                inner.side_map(side).entry(price).or_default().push_back(order.clone());
                inner.index.insert(order.id, (side, price));
                trace!(order_id = order.id.get(), price = %price, "rested new order");
            }
            Some((old_side, old_price)) => {
                let moves = old_side != order.side || old_price != order.price || {
                    let remaining = order.remaining_quantity();
                    let old_remaining = inner
                        .side_map_ref(old_side)
                        .get(&old_price)
                        .and_then(|level| level.iter().find(|o| o.id == order.id))
                        .map(Order::remaining_quantity)
                        .unwrap_or(0);
                    remaining > old_remaining
                };
                if moves {
                    inner.remove_from_level(old_side, old_price, order.id);
                    let price = order.price;
                    let side = order.side;
                    inner.side_map(side).entry(price).or_default().push_back(order.clone());
                    inner.index.insert(order.id, (side, price));
                    trace!(order_id = order.id.get(), "moved order to tail (priority reset)");
                } else {
                    let map = inner.side_map(old_side);
                    if let Some(level) = map.get_mut(&old_price) {
                        for resident in level.iter_mut() {
                            if resident.id == order.id {
                                *resident = order.clone();
                                break;
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    pub fn remove_by_id(&self, id: OrderId) -> bool {
        let mut inner = self.inner.lock();
        match inner.index.remove(&id) {
            Some((side, price)) => inner.remove_from_level(side, price, id).is_some(),
            None => false,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let inner = self.inner.lock();
        let levels = |map: &BTreeMap<Decimal, Level>, rev: bool| -> Vec<PriceLevelSnapshot> {
            let mut out: Vec<PriceLevelSnapshot> = map
                .iter()
                .map(|(price, level)| PriceLevelSnapshot {
                    price: *price,
                    total_remaining_quantity: level.total_remaining_quantity(),
                    order_count: level.iter().count(),
                })
                .collect();
            if rev {
                out.reverse();
            }
            out
        };
        Snapshot {
            bids: levels(&inner.bids, true),
            asks: levels(&inner.asks, false),
        }
    }

    /// Returns the best non-excluded order on `side` without removing it.
    pub fn peek_best(&self, side: OrderSide, exclude_user_id: Option<UserId>) -> Option<Order> {
        let inner = self.inner.lock();
        Self::best_level_iter(&inner, side)
            .find_map(|(_, level)| level.front_excluding(exclude_user_id).cloned())
    }

    /// Removes and returns the best non-excluded order on `side`, dropping
    /// any emptied level it leaves behind.
    pub fn remove_best(&self, side: OrderSide, exclude_user_id: Option<UserId>) -> Option<Order> {
        let mut inner = self.inner.lock();
        let price = Self::best_level_iter(&inner, side)
            .find(|(_, level)| level.front_excluding(exclude_user_id).is_some())
            .map(|(price, _)| price)?;
        let map = inner.side_map(side);
        let level = map.get_mut(&price)?;
        let taken = level.take_front_excluding(exclude_user_id)?;
        if level.is_empty() {
            map.remove(&price);
        }
        inner.index.remove(&taken.id);
        Some(taken)
    }

    fn best_level_iter(inner: &BookInner, side: OrderSide) -> Box<dyn Iterator<Item = (Decimal, &Level)> + '_> {
        match side {
            OrderSide::Buy => Box::new(inner.bids.iter().rev().map(|(p, l)| (*p, l))),
            OrderSide::Sell => Box::new(inner.asks.iter().map(|(p, l)| (*p, l))),
        }
    }

    /// Non-mutating consistency check (SPEC_FULL.md §4.1 `ValidateIndex`).
    pub fn validate_index(&self) -> (bool, String) {
        let inner = self.inner.lock();
        for (id, (side, price)) in inner.index.iter() {
            let map = inner.side_map_ref(*side);
            match map.get(price) {
                None => return (false, format!("index points at missing price level: order {id:?} at {price}")),
                Some(level) => {
                    if !level.iter().any(|o| o.id == *id) {
                        return (false, format!("index points at order {id:?} not present in its level"));
                    }
                }
            }
        }
        for (map, _label) in [(&inner.bids, "bids"), (&inner.asks, "asks")] {
            for (price, level) in map.iter() {
                if level.is_empty() {
                    return (false, format!("empty level left at price {price}"));
                }
                for order in level.iter() {
                    if !order.is_open_limit() {
                        return (false, format!("non-open-limit order {:?} resident in book", order.id));
                    }
                    match inner.index.get(&order.id) {
                        Some((side, p)) if *p == *price => {
                            let expected_side = if std::ptr::eq(map, &inner.bids) {
                                OrderSide::Buy
                            } else {
                                OrderSide::Sell
                            };
                            if *side != expected_side {
                                return (false, format!("index side mismatch for order {:?}", order.id));
                            }
                        }
                        _ => return (false, format!("orphaned order {:?} with no matching index entry", order.id)),
                    }
                }
            }
        }
        (true, String::new())
    }

    /// Reconciles book vs index in place (SPEC_FULL.md §4.1 `FixAll`).
    pub fn fix_all(&self) -> FixReport {
        let mut inner = self.inner.lock();
        let mut report = FixReport::default();

        let stale_ids: Vec<OrderId> = inner
            .index
            .iter()
            .filter(|(id, (side, price))| {
                !inner
                    .side_map_ref(**side)
                    .get(price)
                    .is_some_and(|level| level.iter().any(|o| o.id == **id))
            })
            .map(|(id, _)| *id)
            .collect();
        for id in stale_ids {
            inner.index.remove(&id);
            report.removed_orphaned_index_entries += 1;
        }

        for (side, map_name) in [(OrderSide::Buy, "bids"), (OrderSide::Sell, "asks")] {
            let prices: Vec<Decimal> = inner.side_map(side).keys().copied().collect();
            for price in prices {
                let invalid_ids: Vec<OrderId> = {
                    let map = inner.side_map(side);
                    let Some(level) = map.get(&price) else { continue };
                    level
                        .iter()
                        .filter(|o| !o.is_open_limit() || o.stock_id != self.stock_id || o.currency != self.currency)
                        .map(|o| o.id)
                        .collect()
                };
                for id in invalid_ids {
                    inner.remove_from_level(side, price, id);
                    inner.index.remove(&id);
                    report.removed_invalid_orders += 1;
                    warn!(order_id = id.get(), side = map_name, "fix_all removed invalid resident order");
                }
                let now_empty = inner.side_map(side).get(&price).is_some_and(Level::is_empty);
                if now_empty {
                    inner.side_map(side).remove(&price);
                    report.removed_empty_levels += 1;
                }
            }
        }
        report
    }

    /// Rebuilds the index from the two price maps from scratch
    /// (SPEC_FULL.md §4.1 `RebuildIndex`, the last-resort repair path).
    pub fn rebuild_index(&self) {
        let mut inner = self.inner.lock();
        let mut fresh = HashMap::new();
        for (price, level) in inner.bids.iter() {
            for order in level.iter() {
                fresh.insert(order.id, (OrderSide::Buy, *price));
            }
        }
        for (price, level) in inner.asks.iter() {
            for order in level.iter() {
                fresh.insert(order.id, (OrderSide::Sell, *price));
            }
        }
        inner.index = fresh;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OrderType;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn order(id: i64, user_id: i64, side: OrderSide, price: Decimal, qty: u64) -> Order {
        let now = Utc::now();
        Order {
            id: OrderId(id),
            user_id: UserId(user_id),
            stock_id: StockId(1),
            currency: Currency::Usd,
            side,
            order_type: OrderType::Limit,
            price,
            slippage_percent: Decimal::ZERO,
            quantity: qty,
            amount_filled: 0,
            status: OrderStatus::Open,
            buy_budget: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn upsert_then_peek_best_respects_price_priority() {
        let book = OrderBook::new(StockId(1), Currency::Usd);
        book.upsert_order(order(1, 1, OrderSide::Sell, dec!(101), 5)).unwrap();
        book.upsert_order(order(2, 2, OrderSide::Sell, dec!(100), 5)).unwrap();
        let best = book.peek_best(OrderSide::Sell, None).unwrap();
        assert_eq!(best.id, OrderId(2));
    }

    #[test]
    fn remove_best_excludes_given_user() {
        let book = OrderBook::new(StockId(1), Currency::Usd);
        book.upsert_order(order(1, 7, OrderSide::Sell, dec!(100), 5)).unwrap();
        book.upsert_order(order(2, 8, OrderSide::Sell, dec!(100), 5)).unwrap();
        let picked = book.remove_best(OrderSide::Sell, Some(UserId(7))).unwrap();
        assert_eq!(picked.id, OrderId(2));
        assert!(book.peek_best(OrderSide::Sell, Some(UserId(7))).is_none());
    }

    #[test]
    fn fix_all_removes_orphaned_index_entry() {
        let book = OrderBook::new(StockId(1), Currency::Usd);
        book.upsert_order(order(1, 1, OrderSide::Buy, dec!(100), 5)).unwrap();
        // simulate corruption: remove the resident order directly, leaving the index stale
        {
            let mut inner = book.inner.lock();
            inner.bids.get_mut(&dec!(100)).unwrap().remove(OrderId(1));
        }
        let (ok, _) = book.validate_index();
        assert!(!ok);
        let report = book.fix_all();
        assert_eq!(report.removed_orphaned_index_entries, 1);
        let (ok, reason) = book.validate_index();
        assert!(ok, "expected clean index, got {reason}");
    }

    #[test]
    fn upsert_price_change_moves_to_tail() {
        let book = OrderBook::new(StockId(1), Currency::Usd);
        let mut o1 = order(1, 1, OrderSide::Buy, dec!(100), 5);
        book.upsert_order(o1.clone()).unwrap();
        let o2 = order(2, 2, OrderSide::Buy, dec!(100), 5);
        book.upsert_order(o2).unwrap();
        o1.price = dec!(101);
        book.upsert_order(o1).unwrap();
        let best = book.peek_best(OrderSide::Buy, None).unwrap();
        assert_eq!(best.id, OrderId(1), "moved order should now be best by price");
    }
}

use std::collections::VecDeque;

use crate::ids::OrderId;
use crate::model::Order;

/// A FIFO sequence of resting orders at a single price on one side of a
/// book (SPEC_FULL.md §4.1). Insertion order is time priority.
#[derive(Debug, Default)]
pub struct Level {
    orders: VecDeque<Order>,
}

impl Level {
    pub fn push_back(&mut self, order: Order) {
        self.orders.push_back(order);
    }

    pub fn front(&self) -> Option<&Order> {
        self.orders.front()
    }

    pub fn front_mut(&mut self) -> Option<&mut Order> {
        self.orders.front_mut()
    }

    pub fn front_excluding(&self, exclude_user_id: Option<crate::ids::UserId>) -> Option<&Order> {
        self.orders
            .iter()
            .find(|o| exclude_user_id.is_none_or(|uid| o.user_id != uid))
    }

    pub fn pop_front(&mut self) -> Option<Order> {
        self.orders.pop_front()
    }

    pub fn remove(&mut self, id: OrderId) -> Option<Order> {
        let pos = self.orders.iter().position(|o| o.id == id)?;
        self.orders.remove(pos)
    }

    /// Pops the front order owned by `exclude_user_id`'s complement,
    /// leaving self-owned orders ahead of it untouched (no-self-match).
    pub fn take_front_excluding(&mut self, exclude_user_id: Option<crate::ids::UserId>) -> Option<Order> {
        let pos = self
            .orders
            .iter()
            .position(|o| exclude_user_id.is_none_or(|uid| o.user_id != uid))?;
        self.orders.remove(pos)
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn total_remaining_quantity(&self) -> u64 {
        self.orders.iter().map(Order::remaining_quantity).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Order> {
        self.orders.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Currency, OrderSide, OrderStatus, OrderType};
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn order(id: i64, user_id: i64) -> Order {
        let now = Utc::now();
        Order {
            id: OrderId(id),
            user_id: crate::ids::UserId(user_id),
            stock_id: crate::ids::StockId(1),
            currency: Currency::Usd,
            side: OrderSide::Buy,
            order_type: OrderType::Limit,
            price: Decimal::TEN,
            slippage_percent: Decimal::ZERO,
            quantity: 5,
            amount_filled: 0,
            status: OrderStatus::Open,
            buy_budget: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn fifo_order_is_preserved() {
        let mut level = Level::default();
        level.push_back(order(1, 1));
        level.push_back(order(2, 1));
        assert_eq!(level.pop_front().unwrap().id, OrderId(1));
        assert_eq!(level.pop_front().unwrap().id, OrderId(2));
    }

    #[test]
    fn take_front_excluding_skips_same_user() {
        let mut level = Level::default();
        level.push_back(order(1, 7)); // owned by excluded user
        level.push_back(order(2, 8));
        let picked = level.take_front_excluding(Some(crate::ids::UserId(7))).unwrap();
        assert_eq!(picked.id, OrderId(2));
        // order 1 remains, still at the front
        assert_eq!(level.front().unwrap().id, OrderId(1));
    }
}

use chrono::{DateTime, Utc};
use derive_more::Display;
use rust_decimal::Decimal;

use crate::ids::{OrderId, StockId, UserId};
use crate::model::Currency;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    Limit,
    TrueMarket,
    SlippageMarket,
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Open,
    Filled,
    Cancelled,
}

/// A buy or sell order (SPEC_FULL.md §3). `price` is the limit price for
/// `Limit` orders, the slippage anchor for `SlippageMarket` orders, and
/// zero for `TrueMarket` orders.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub stock_id: StockId,
    pub currency: Currency,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub price: Decimal,
    /// Only meaningful for `SlippageMarket`; in `[0, 100]`.
    pub slippage_percent: Decimal,
    pub quantity: u64,
    pub amount_filled: u64,
    pub status: OrderStatus,
    /// Only meaningful for `TrueMarket` buys: the cash ceiling for the
    /// whole order, independent of `price` (which is zero for this type).
    pub buy_budget: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn remaining_quantity(&self) -> u64 {
        self.quantity.saturating_sub(self.amount_filled)
    }

    pub fn is_open_limit(&self) -> bool {
        self.status == OrderStatus::Open && self.order_type == OrderType::Limit
    }

    /// The price a taker of this order effectively stops crossing at, used
    /// by the matching loop's "crossed" test (SPEC_FULL.md §4.2 step 5).
    /// `None` for `TrueMarket`, which is always crossed.
    pub fn effective_taker_limit(&self) -> Option<Decimal> {
        match self.order_type {
            OrderType::TrueMarket => None,
            OrderType::Limit => Some(self.price),
            OrderType::SlippageMarket => {
                let factor = Decimal::ONE
                    + match self.side {
                        OrderSide::Buy => self.slippage_percent / Decimal::from(100),
                        OrderSide::Sell => -(self.slippage_percent / Decimal::from(100)),
                    };
                Some(self.price * factor)
            }
        }
    }

    pub fn mark_filled_if_complete(&mut self, now: DateTime<Utc>) {
        if self.amount_filled >= self.quantity {
            self.status = OrderStatus::Filled;
        }
        self.updated_at = now;
    }
}

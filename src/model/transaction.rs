use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::ids::{OrderId, StockId, TransactionId, UserId};
use crate::model::Currency;

/// An immutable record of a single fill between two orders.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub stock_id: StockId,
    pub currency: Currency,
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub price: Decimal,
    pub quantity: u64,
    pub timestamp: DateTime<Utc>,
}

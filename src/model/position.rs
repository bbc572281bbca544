use crate::ids::{PositionId, StockId, UserId};

/// A user's share holding in one stock (SPEC_FULL.md §3 / §4.5).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub user_id: UserId,
    pub stock_id: StockId,
    pub quantity: u64,
    pub reserved_quantity: u64,
}

impl Position {
    pub fn new(id: PositionId, user_id: UserId, stock_id: StockId) -> Self {
        Self {
            id,
            user_id,
            stock_id,
            quantity: 0,
            reserved_quantity: 0,
        }
    }

    pub fn available_quantity(&self) -> u64 {
        self.quantity.saturating_sub(self.reserved_quantity)
    }
}

use rust_decimal::Decimal;

use crate::ids::{FundId, UserId};
use crate::model::Currency;

/// A user's cash balance in one currency (SPEC_FULL.md §3 / §4.5).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Fund {
    pub id: FundId,
    pub user_id: UserId,
    pub currency: Currency,
    pub total_balance: Decimal,
    pub reserved_balance: Decimal,
}

impl Fund {
    pub fn new(id: FundId, user_id: UserId, currency: Currency) -> Self {
        Self {
            id,
            user_id,
            currency,
            total_balance: Decimal::ZERO,
            reserved_balance: Decimal::ZERO,
        }
    }

    pub fn available_balance(&self) -> Decimal {
        self.total_balance - self.reserved_balance
    }
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::ids::StockId;
use crate::model::Currency;

/// The current session snapshot for one (stock, currency) pair
/// (SPEC_FULL.md §4.9). Sessions reset at UTC midnight.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LiveQuote {
    pub stock_id: StockId,
    pub currency: Currency,
    pub open: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub last_price: Option<Decimal>,
    pub volume: u64,
    pub last_updated: Option<DateTime<Utc>>,
    pub session_start_utc: DateTime<Utc>,
}

impl LiveQuote {
    pub fn new_session(stock_id: StockId, currency: Currency, session_start_utc: DateTime<Utc>) -> Self {
        Self {
            stock_id,
            currency,
            open: None,
            high: None,
            low: None,
            last_price: None,
            volume: 0,
            last_updated: None,
            session_start_utc,
        }
    }

    /// Percent change of `last_price` vs. `open`, or `None` if either is
    /// unset.
    pub fn change_pct(&self) -> Option<Decimal> {
        let open = self.open?;
        let last = self.last_price?;
        if open.is_zero() {
            return None;
        }
        Some((last - open) / open * Decimal::from(100))
    }
}

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::ids::{AiUserId, StockId, UserId};

/// Configuration and per-day state for one synthetic trader
/// (SPEC_FULL.md §3 / §4.10).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AiUser {
    pub id: AiUserId,
    pub user_id: UserId,
    pub seed: u64,
    pub decision_interval: chrono::Duration,
    pub online_prob: Decimal,
    pub trade_prob: Decimal,
    pub use_market_prob: Decimal,
    pub use_slippage_market_prob: Decimal,
    pub aggressiveness: Decimal,
    pub watchlist: HashSet<StockId>,

    pub max_daily_trades: u32,
    pub max_open_orders: u32,
    pub min_cash_reserve_prc: Decimal,
    pub max_cash_reserve_prc: Decimal,
    pub min_trade_amount_prc: Decimal,
    pub max_trade_amount_prc: Decimal,
    pub per_position_max_prc: Decimal,

    /// Recomputed once per online-decision interval.
    pub is_enabled: bool,
    pub trades_today: u32,
    pub last_decision_at: Option<DateTime<Utc>>,
    pub last_daily_reset_date: Option<chrono::NaiveDate>,
}

impl AiUser {
    pub fn reset_daily_counters(&mut self, today: chrono::NaiveDate) {
        self.trades_today = 0;
        self.last_daily_reset_date = Some(today);
    }

    pub fn is_due_for_decision(&self, now: DateTime<Utc>) -> bool {
        match self.last_decision_at {
            None => true,
            Some(last) => now - last >= self.decision_interval,
        }
    }

    pub fn daily_limits_reached(&self) -> bool {
        self.trades_today >= self.max_daily_trades
    }
}

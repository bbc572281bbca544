use chrono::{DateTime, Utc};
use derive_more::Display;
use rust_decimal::Decimal;

use crate::ids::StockId;
use crate::model::Currency;

/// Supported aggregation bucket widths, in seconds (SPEC_FULL.md §6).
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum CandleResolution {
    #[display("1s")]
    OneSecond,
    #[display("5s")]
    FiveSeconds,
    #[display("15s")]
    FifteenSeconds,
    #[display("1m")]
    OneMinute,
    #[display("5m")]
    FiveMinutes,
    #[display("15m")]
    FifteenMinutes,
    #[display("30m")]
    ThirtyMinutes,
    #[display("1h")]
    OneHour,
    #[display("4h")]
    FourHours,
    #[display("1d")]
    OneDay,
    #[display("1w")]
    OneWeek,
}

impl CandleResolution {
    pub const ALL: [CandleResolution; 11] = [
        Self::OneSecond,
        Self::FiveSeconds,
        Self::FifteenSeconds,
        Self::OneMinute,
        Self::FiveMinutes,
        Self::FifteenMinutes,
        Self::ThirtyMinutes,
        Self::OneHour,
        Self::FourHours,
        Self::OneDay,
        Self::OneWeek,
    ];

    pub const fn seconds(self) -> i64 {
        match self {
            Self::OneSecond => 1,
            Self::FiveSeconds => 5,
            Self::FifteenSeconds => 15,
            Self::OneMinute => 60,
            Self::FiveMinutes => 300,
            Self::FifteenMinutes => 900,
            Self::ThirtyMinutes => 1800,
            Self::OneHour => 3600,
            Self::FourHours => 14_400,
            Self::OneDay => 86_400,
            Self::OneWeek => 604_800,
        }
    }
}

impl Default for CandleResolution {
    fn default() -> Self {
        Self::FiveMinutes
    }
}

/// One OHLCV bar (SPEC_FULL.md §3 / §4.8). `open_time` is always aligned to
/// `resolution`'s bucket width; candles are immutable once closed.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Candle {
    pub stock_id: StockId,
    pub currency: Currency,
    pub resolution: CandleResolution,
    pub open_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: u64,
    pub trade_count: u64,
}

impl Candle {
    pub fn close_time(&self) -> DateTime<Utc> {
        self.open_time + chrono::Duration::seconds(self.resolution.seconds())
    }

    /// A flat candle with no trades, used to fill gaps between sparse
    /// ticks (SPEC_FULL.md §4.8 step 2/4).
    pub fn gap(
        stock_id: StockId,
        currency: Currency,
        resolution: CandleResolution,
        open_time: DateTime<Utc>,
        flat_price: Decimal,
    ) -> Self {
        Self {
            stock_id,
            currency,
            resolution,
            open_time,
            open: flat_price,
            high: flat_price,
            low: flat_price,
            close: flat_price,
            volume: 0,
            trade_count: 0,
        }
    }

    pub fn apply_tick(&mut self, price: Decimal, quantity: u64) {
        if price > self.high {
            self.high = price;
        }
        if price < self.low {
            self.low = price;
        }
        self.close = price;
        self.volume += quantity;
        self.trade_count += 1;
    }
}

//! Core domain entities (SPEC_FULL.md §3).

mod ai_user;
mod candle;
mod fund;
mod order;
mod position;
mod quote;
mod stock;
mod transaction;

pub use ai_user::AiUser;
pub use candle::{Candle, CandleResolution};
pub use fund::Fund;
pub use order::{Order, OrderSide, OrderStatus, OrderType};
pub use position::Position;
pub use quote::LiveQuote;
pub use stock::Stock;
pub use transaction::Transaction;

use derive_more::Display;

/// The six currencies the exchange settles in. FX conversion is out of
/// scope (SPEC_FULL.md §1); each currency is a closed settlement unit.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
    Jpy,
    Chf,
    Aud,
}

impl Currency {
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "USD" => Some(Self::Usd),
            "EUR" => Some(Self::Eur),
            "GBP" => Some(Self::Gbp),
            "JPY" => Some(Self::Jpy),
            "CHF" => Some(Self::Chf),
            "AUD" => Some(Self::Aud),
            _ => None,
        }
    }

    /// Fractional-digit precision used when rounding amounts in this
    /// currency (SPEC_FULL.md §3.1).
    pub const fn decimal_places(self) -> u32 {
        match self {
            Currency::Jpy => 0,
            _ => 2,
        }
    }
}

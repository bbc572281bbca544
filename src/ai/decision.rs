//! Pure decision helpers for one AI user's tick (SPEC_FULL.md §4.10).
//! Kept free of I/O so they can be unit-tested deterministically.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::Rng;
use rust_decimal::Decimal;

use crate::ids::{AiUserId, StockId};
use crate::model::{AiUser, OrderSide, OrderType};
use crate::util::{clamp01, lerp};

/// Deterministic per-(user, day) RNG seed (SPEC_FULL.md §4.10 step 2).
pub fn daily_seed(base_seed: u64, user_id: AiUserId, date: chrono::NaiveDate) -> u64 {
    let mut hasher = DefaultHasher::new();
    base_seed.hash(&mut hasher);
    user_id.get().hash(&mut hasher);
    date.hash(&mut hasher);
    hasher.finish()
}

#[derive(Debug, Clone, Copy)]
pub struct DecisionInputs {
    pub cash_available_pct: Decimal,
    pub market_price: Decimal,
    pub portfolio_value: Decimal,
    pub available_shares: u64,
}

#[derive(Debug, Clone)]
pub struct Decision {
    pub stock_id: StockId,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub price: Decimal,
    pub slippage_percent: Decimal,
    pub quantity: u64,
    pub buy_budget: Option<Decimal>,
}

/// Chooses buy vs. sell with a cash-reserve-aware bias
/// (SPEC_FULL.md §4.10 step 4b).
pub fn choose_side(user: &AiUser, inputs: &DecisionInputs, rng: &mut impl Rng) -> OrderSide {
    let mut buy_prob = Decimal::from_f64_retain(0.5).unwrap();
    let max_bias = Decimal::from_f64_retain(0.40).unwrap();
    if inputs.cash_available_pct < user.min_cash_reserve_prc {
        buy_prob -= max_bias;
    } else if inputs.cash_available_pct > user.max_cash_reserve_prc {
        buy_prob += max_bias;
    }
    let roll = Decimal::from_f64_retain(rng.gen_range(0.0..1.0)).unwrap();
    if roll < clamp01(buy_prob) {
        OrderSide::Buy
    } else {
        OrderSide::Sell
    }
}

pub fn choose_order_type(user: &AiUser, rng: &mut impl Rng) -> OrderType {
    let roll = Decimal::from_f64_retain(rng.gen_range(0.0..1.0)).unwrap();
    if roll >= user.use_market_prob {
        OrderType::Limit
    } else {
        let slippage_roll = Decimal::from_f64_retain(rng.gen_range(0.0..1.0)).unwrap();
        if slippage_roll < user.use_slippage_market_prob {
            OrderType::SlippageMarket
        } else {
            OrderType::TrueMarket
        }
    }
}

/// Offsets the current market price by an aggressiveness-scaled amount
/// (SPEC_FULL.md §4.10 step 4d).
pub fn choose_limit_price(
    side: OrderSide,
    market_price: Decimal,
    min_offset: Decimal,
    max_offset: Decimal,
    aggressiveness: Decimal,
    jitter: Decimal,
) -> Decimal {
    let base_offset = lerp(min_offset, max_offset, jitter) * (Decimal::ONE + aggressiveness);
    let offset = base_offset.min(max_offset);
    match side {
        OrderSide::Buy => market_price * (Decimal::ONE - offset),
        OrderSide::Sell => market_price * (Decimal::ONE + offset),
    }
}

/// Computes an order quantity from a trade-size percentage of portfolio
/// value, clamped by availability and the per-position cap
/// (SPEC_FULL.md §4.10 step 4e).
pub fn choose_quantity(
    side: OrderSide,
    inputs: &DecisionInputs,
    trade_pct: Decimal,
    per_position_max_pct: Decimal,
    price: Decimal,
) -> u64 {
    if price <= Decimal::ZERO {
        return 0;
    }
    let target_value = inputs.portfolio_value * trade_pct;
    let cap_value = inputs.portfolio_value * per_position_max_pct;
    let value = target_value.min(cap_value);
    let qty_from_value = (value / price).floor();
    let qty: u64 = qty_from_value.max(Decimal::ZERO).try_into().unwrap_or(0);
    match side {
        OrderSide::Sell => qty.min(inputs.available_shares),
        OrderSide::Buy => qty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_seed_is_deterministic_per_user_and_day() {
        let date = chrono::NaiveDate::from_ymd_opt(2026, 7, 28).unwrap();
        let a = daily_seed(42, AiUserId(1), date);
        let b = daily_seed(42, AiUserId(1), date);
        let c = daily_seed(42, AiUserId(2), date);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn choose_quantity_respects_per_position_cap() {
        let inputs = DecisionInputs {
            cash_available_pct: Decimal::from_f64_retain(0.5).unwrap(),
            market_price: Decimal::from(10),
            portfolio_value: Decimal::from(1000),
            available_shares: 1000,
        };
        let qty = choose_quantity(
            OrderSide::Buy,
            &inputs,
            Decimal::from_f64_retain(0.9).unwrap(),
            Decimal::from_f64_retain(0.1).unwrap(),
            Decimal::from(10),
        );
        // cap is 10% of 1000 = 100 value -> 10 shares, even though trade_pct alone would ask for 90
        assert_eq!(qty, 10);
    }

    #[test]
    fn choose_quantity_clamps_sells_to_available_shares() {
        let inputs = DecisionInputs {
            cash_available_pct: Decimal::from_f64_retain(0.5).unwrap(),
            market_price: Decimal::from(10),
            portfolio_value: Decimal::from(1000),
            available_shares: 3,
        };
        let qty = choose_quantity(
            OrderSide::Sell,
            &inputs,
            Decimal::from_f64_retain(0.9).unwrap(),
            Decimal::from_f64_retain(0.9).unwrap(),
            Decimal::from(10),
        );
        assert_eq!(qty, 3);
    }
}

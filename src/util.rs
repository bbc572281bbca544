//! Small pure helpers shared across subsystems (SPEC_FULL.md §3.1, §4.10, §9).

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::model::Currency;

/// Rounds `amount` to the fractional precision conventional for `currency`
/// (SPEC_FULL.md §3.1): 2 digits for USD/EUR/GBP/CHF/AUD, 0 for JPY.
pub fn round_money(amount: Decimal, currency: Currency) -> Decimal {
    amount.round_dp_with_strategy(currency.decimal_places(), RoundingStrategy::MidpointAwayFromZero)
}

/// Floors `at` to the start of the bucket of width `bucket_seconds` it
/// falls in (SPEC_FULL.md §4.8 step 1).
pub fn floor_to_bucket(at: DateTime<Utc>, bucket_seconds: i64) -> DateTime<Utc> {
    let epoch = at.timestamp();
    let floored = epoch.div_euclid(bucket_seconds) * bucket_seconds;
    Utc.timestamp_opt(floored, 0).single().expect("valid bucket timestamp")
}

pub fn lerp(min: Decimal, max: Decimal, t: Decimal) -> Decimal {
    min + (max - min) * t.clamp(Decimal::ZERO, Decimal::ONE)
}

pub fn clamp01(value: Decimal) -> Decimal {
    value.clamp(Decimal::ZERO, Decimal::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_jpy_to_whole_units() {
        assert_eq!(round_money(dec!(100.6), Currency::Jpy), dec!(101));
    }

    #[test]
    fn rounds_usd_to_cents() {
        assert_eq!(round_money(dec!(1.005), Currency::Usd), dec!(1.01));
    }

    #[test]
    fn floors_to_bucket_start() {
        let t0 = Utc.timestamp_opt(0, 0).single().unwrap();
        let t = t0 + Duration::seconds(135);
        assert_eq!(floor_to_bucket(t, 60), t0 + Duration::seconds(120));
    }

    #[test]
    fn lerp_clamps_t() {
        assert_eq!(lerp(dec!(0), dec!(10), dec!(2)), dec!(10));
        assert_eq!(lerp(dec!(0), dec!(10), dec!(-1)), dec!(0));
    }
}

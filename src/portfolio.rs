//! `PortfolioMutationService` (SPEC_FULL.md §4.5): primitive, explicit-
//! failure mutations over Fund and Position rows.

use rust_decimal::Decimal;

use crate::model::{Fund, Position};

/// Fund (cash) primitives. Every method leaves `fund` untouched on
/// rejection, mirroring the spec's "violations return false" contract.
pub trait FundMutation {
    fn add(&mut self, amount: Decimal) -> bool;
    fn withdraw(&mut self, amount: Decimal) -> bool;
    fn reserve(&mut self, amount: Decimal) -> bool;
    fn unreserve(&mut self, amount: Decimal) -> bool;
    fn consume_reserved(&mut self, amount: Decimal) -> bool;
}

impl FundMutation for Fund {
    fn add(&mut self, amount: Decimal) -> bool {
        if amount <= Decimal::ZERO {
            return false;
        }
        self.total_balance += amount;
        true
    }

    fn withdraw(&mut self, amount: Decimal) -> bool {
        if amount <= Decimal::ZERO || amount > self.available_balance() {
            return false;
        }
        self.total_balance -= amount;
        true
    }

    fn reserve(&mut self, amount: Decimal) -> bool {
        if amount <= Decimal::ZERO || amount > self.available_balance() {
            return false;
        }
        self.reserved_balance += amount;
        true
    }

    fn unreserve(&mut self, amount: Decimal) -> bool {
        if amount <= Decimal::ZERO || amount > self.reserved_balance {
            return false;
        }
        self.reserved_balance -= amount;
        true
    }

    fn consume_reserved(&mut self, amount: Decimal) -> bool {
        if amount <= Decimal::ZERO || amount > self.reserved_balance {
            return false;
        }
        self.reserved_balance -= amount;
        self.total_balance -= amount;
        true
    }
}

/// Position (share) primitives, structurally identical to [`FundMutation`]
/// but over integer share quantities.
pub trait PositionMutation {
    fn add(&mut self, amount: u64) -> bool;
    fn withdraw(&mut self, amount: u64) -> bool;
    fn reserve(&mut self, amount: u64) -> bool;
    fn unreserve(&mut self, amount: u64) -> bool;
    fn consume_reserved(&mut self, amount: u64) -> bool;
}

impl PositionMutation for Position {
    fn add(&mut self, amount: u64) -> bool {
        if amount == 0 {
            return false;
        }
        self.quantity += amount;
        true
    }

    fn withdraw(&mut self, amount: u64) -> bool {
        if amount == 0 || amount > self.available_quantity() {
            return false;
        }
        self.quantity -= amount;
        true
    }

    fn reserve(&mut self, amount: u64) -> bool {
        if amount == 0 || amount > self.available_quantity() {
            return false;
        }
        self.reserved_quantity += amount;
        true
    }

    fn unreserve(&mut self, amount: u64) -> bool {
        if amount == 0 || amount > self.reserved_quantity {
            return false;
        }
        self.reserved_quantity -= amount;
        true
    }

    fn consume_reserved(&mut self, amount: u64) -> bool {
        if amount == 0 || amount > self.reserved_quantity {
            return false;
        }
        self.reserved_quantity -= amount;
        self.quantity -= amount;
        true
    }
}

/// Consolidates duplicate rows for the same key, summing totals/reserved
/// and clamping to a consistent state. Used to merge rows produced by a
/// race between concurrent lazy-creation paths; the merge itself always
/// happens inside one persistence transaction at the call site.
pub fn normalize_funds(mut rows: Vec<Fund>) -> Option<Fund> {
    rows.sort_by_key(|f| f.id.get());
    let mut iter = rows.into_iter();
    let mut base = iter.next()?;
    for other in iter {
        base.total_balance += other.total_balance;
        base.reserved_balance += other.reserved_balance;
    }
    if base.reserved_balance > base.total_balance {
        base.reserved_balance = base.total_balance;
    }
    if base.total_balance < Decimal::ZERO {
        base.total_balance = Decimal::ZERO;
    }
    Some(base)
}

pub fn normalize_positions(mut rows: Vec<Position>) -> Option<Position> {
    rows.sort_by_key(|p| p.id.get());
    let mut iter = rows.into_iter();
    let mut base = iter.next()?;
    for other in iter {
        base.quantity += other.quantity;
        base.reserved_quantity += other.reserved_quantity;
    }
    if base.reserved_quantity > base.quantity {
        base.reserved_quantity = base.quantity;
    }
    Some(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{FundId, PositionId, StockId, UserId};
    use crate::model::Currency;
    use rust_decimal_macros::dec;

    fn fund(total: Decimal, reserved: Decimal) -> Fund {
        Fund {
            id: FundId(1),
            user_id: UserId(1),
            currency: Currency::Usd,
            total_balance: total,
            reserved_balance: reserved,
        }
    }

    #[test]
    fn reserve_then_unreserve_is_a_no_op_on_totals() {
        let mut f = fund(dec!(100), dec!(0));
        assert!(f.reserve(dec!(40)));
        assert!(f.unreserve(dec!(40)));
        assert_eq!(f, fund(dec!(100), dec!(0)));
    }

    #[test]
    fn reserve_then_consume_equals_withdraw() {
        let mut reserved_then_consumed = fund(dec!(100), dec!(0));
        assert!(reserved_then_consumed.reserve(dec!(40)));
        assert!(reserved_then_consumed.consume_reserved(dec!(40)));

        let mut withdrawn = fund(dec!(100), dec!(0));
        assert!(withdrawn.withdraw(dec!(40)));

        assert_eq!(reserved_then_consumed.total_balance, withdrawn.total_balance);
    }

    #[test]
    fn violations_leave_state_untouched() {
        let mut f = fund(dec!(10), dec!(5));
        let before = f.clone();
        assert!(!f.reserve(dec!(100)));
        assert_eq!(f, before);
        assert!(!f.unreserve(dec!(100)));
        assert_eq!(f, before);
    }

    #[test]
    fn position_primitives_mirror_fund_primitives() {
        let mut p = Position::new(PositionId(1), UserId(1), StockId(1));
        p.add(10);
        assert!(p.reserve(4));
        assert!(p.consume_reserved(4));
        assert_eq!(p.quantity, 6);
        assert_eq!(p.reserved_quantity, 0);
    }
}

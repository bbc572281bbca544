//! Server-assigned identifiers.
//!
//! Every id here is a monotonically increasing `i64`, never reused. That
//! property is load-bearing: it lets [`crate::book::OrderBook`]'s index use
//! the id itself as a stable handle instead of a separate generation-tagged
//! arena (see `SPEC_FULL.md` §9).

use std::sync::atomic::{AtomicI64, Ordering};

use derive_more::{Display, From};

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Display, From, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[derive(serde::Serialize, serde::Deserialize)]
        pub struct $name(pub i64);

        impl $name {
            pub const fn get(self) -> i64 {
                self.0
            }
        }
    };
}

id_type!(StockId);
id_type!(OrderId);
id_type!(TransactionId);
id_type!(FundId);
id_type!(PositionId);
id_type!(UserId);
id_type!(AiUserId);

/// Monotonic, never-reused id generator backing every entity above.
#[derive(Debug)]
pub struct IdGenerator {
    next: AtomicI64,
}

impl IdGenerator {
    pub const fn starting_at(first: i64) -> Self {
        Self {
            next: AtomicI64::new(first),
        }
    }

    pub fn next_raw(&self) -> i64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let gen = IdGenerator::default();
        let a = gen.next_raw();
        let b = gen.next_raw();
        assert!(b > a);
    }
}

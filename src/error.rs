//! Per-subsystem error taxonomy.
//!
//! Mirrors the teacher's `orderbook::error` style: one `#[non_exhaustive]`
//! enum per subsystem, one doc comment per variant (and per field where the
//! field needs explaining), derived via `thiserror` rather than hand-rolled
//! `Display` impls.

use thiserror::Error;

use crate::ids::{OrderId, StockId};

/// Failures from [`crate::validation::OrderValidator`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    /// `stock_id`/`user_id` must be positive.
    #[error("non-positive id: {field} = {value}")]
    NonPositiveId { field: &'static str, value: i64 },

    /// The referenced stock is not present in the catalog.
    #[error("unknown stock id {0:?}")]
    UnknownStock(StockId),

    /// The currency is not one of the six supported currencies.
    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),

    /// Quantity must be strictly positive.
    #[error("quantity must be > 0, got {0}")]
    NonPositiveQuantity(u64),

    /// A limit order was submitted with a non-positive price.
    #[error("limit order requires a positive price, got {0}")]
    NonPositiveLimitPrice(rust_decimal::Decimal),

    /// A limit order carried a slippage percent, which only applies to
    /// slippage-market orders.
    #[error("limit orders may not specify slippage")]
    UnexpectedSlippage,

    /// A true-market order must have price 0.
    #[error("true-market orders must have price 0, got {0}")]
    TrueMarketNonZeroPrice(rust_decimal::Decimal),

    /// A slippage-market order requires a positive anchor price.
    #[error("slippage-market order requires a positive anchor price, got {0}")]
    NonPositiveAnchorPrice(rust_decimal::Decimal),

    /// Slippage percent must fall within `[0, 100]`.
    #[error("slippage percent out of range [0,100]: {0}")]
    SlippageOutOfRange(rust_decimal::Decimal),

    /// A true-market buy must carry a positive budget.
    #[error("true-market buy requires a positive budget")]
    NonPositiveBudget,

    /// `Modify` attempted to change the price of a non-limit order.
    #[error("price may only be modified on limit orders")]
    PriceModifyOnNonLimit,

    /// `Modify` requested a quantity below what has already filled.
    #[error("new quantity {new} is below amount already filled {filled}")]
    QuantityBelowFilled { new: u64, filled: u64 },
}

/// Failures raised inside [`crate::book::OrderBook`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum OrderBookError {
    /// The order does not belong to this book's (stock, currency) key.
    #[error("order {order_id:?} does not belong to this book (expected stock {expected:?})")]
    WrongBook {
        order_id: OrderId,
        expected: StockId,
    },

    /// The index references an order id with no matching level entry.
    #[error("orphaned index entry for order {0:?}")]
    OrphanedIndexEntry(OrderId),

    /// A price level is present but empty (should have been dropped).
    #[error("empty price level left at price {0}")]
    EmptyLevelLeft(rust_decimal::Decimal),

    /// Index validation failed with a human-readable reason.
    #[error("index inconsistent: {0}")]
    IndexInconsistent(String),
}

/// Failures from [`crate::settlement::SettlementEngine`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettlementError {
    /// The reservation could not be satisfied from available balance.
    #[error("insufficient available balance: need {needed}, have {available}")]
    InsufficientFunds {
        needed: rust_decimal::Decimal,
        available: rust_decimal::Decimal,
    },

    /// The reservation could not be satisfied from available share quantity.
    #[error("insufficient available shares: need {needed}, have {available}")]
    InsufficientShares { needed: u64, available: u64 },

    /// A downstream persistence call failed.
    #[error("persistence operation failed: {0}")]
    Persistence(String),

    /// An order referenced in a settlement step was not found.
    #[error("order {0:?} not found")]
    OrderNotFound(OrderId),
}

/// Failures/terminal states from [`crate::execution::OrderExecutionService`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExecutionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Settlement(#[from] SettlementError),

    #[error(transparent)]
    Book(#[from] OrderBookError),

    /// The operation was cancelled via its `CancellationToken`.
    #[error("operation cancelled")]
    Cancelled,

    /// The caller identity was missing.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The caller is not permitted to perform this (typically admin-only)
    /// operation.
    #[error("not authorized")]
    NotAuthorized,

    /// The order targeted by cancel/modify is no longer open.
    #[error("order {0:?} is already closed")]
    AlreadyClosed(OrderId),
}

//! Stateless taker-vs-book matcher (SPEC_FULL.md §4.2).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{error, trace};

use crate::ids::{OrderId, TransactionId, UserId};
use crate::model::{Currency, Order, OrderSide, OrderStatus, OrderType, Transaction};

use super::orderbook::OrderBook;

/// One run of the matching loop against a single taker.
#[derive(Debug, Default)]
pub struct MatchOutcome {
    pub trades: Vec<Transaction>,
    pub taker: Option<Order>,
}

pub struct MatchingEngine;

impl MatchingEngine {
    /// Crosses `taker` against `book`'s opposite side, mutating resting
    /// orders in place and removing filled makers from the book. Does not
    /// rest the taker itself; the caller (`OrderExecutionService`) decides
    /// whether to upsert the remainder.
    pub fn match_order(
        taker: &mut Order,
        book: &OrderBook,
        next_transaction_id: &mut dyn FnMut() -> TransactionId,
        now: DateTime<Utc>,
    ) -> MatchOutcome {
        let mut outcome = MatchOutcome::default();
        let opposite_side = match taker.side {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        };

        loop {
            if taker.status != OrderStatus::Open || taker.remaining_quantity() == 0 {
                break;
            }

            let Some(maker) = book.peek_best(opposite_side, Some(taker.user_id)) else {
                break;
            };

            if maker.status != OrderStatus::Open || maker.remaining_quantity() == 0 {
                book.remove_by_id(maker.id);
                continue;
            }

            if maker.stock_id != taker.stock_id || maker.currency != taker.currency {
                error!(order_id = maker.id.get(), "maker book key mismatch during match, repairing");
                book.remove_by_id(maker.id);
                continue;
            }

            let crossed = match taker.effective_taker_limit() {
                None => true,
                Some(limit) => match taker.side {
                    OrderSide::Buy => maker.price <= limit,
                    OrderSide::Sell => maker.price >= limit,
                },
            };
            if !crossed {
                break;
            }

            let mut fill_qty = taker.remaining_quantity().min(maker.remaining_quantity());

            if taker.order_type == OrderType::TrueMarket && taker.side == OrderSide::Buy {
                let remaining_budget = taker
                    .buy_budget
                    .unwrap_or(Decimal::ZERO)
                    - outcome
                        .trades
                        .iter()
                        .map(|t| t.price * Decimal::from(t.quantity))
                        .sum::<Decimal>();
                if remaining_budget <= Decimal::ZERO {
                    break;
                }
                let affordable = (remaining_budget / maker.price).floor();
                let affordable_units: u64 = affordable.try_into().unwrap_or(0);
                fill_qty = fill_qty.min(affordable_units);
                if fill_qty == 0 {
                    break;
                }
            }

            let tx_id = next_transaction_id();
            let (buy_order_id, sell_order_id, buyer_id, seller_id) = match taker.side {
                OrderSide::Buy => (taker.id, maker.id, taker.user_id, maker.user_id),
                OrderSide::Sell => (maker.id, taker.id, maker.user_id, taker.user_id),
            };
            debug_assert_ne!(buyer_id, seller_id, "self-match must never occur");

            let trade = Transaction {
                id: tx_id,
                stock_id: taker.stock_id,
                currency: taker.currency,
                buy_order_id,
                sell_order_id,
                buyer_id,
                seller_id,
                price: maker.price,
                quantity: fill_qty,
                timestamp: now,
            };
            trace!(
                taker = taker.id.get(),
                maker = maker.id.get(),
                qty = fill_qty,
                price = %maker.price,
                "matched"
            );

            taker.amount_filled += fill_qty;
            taker.mark_filled_if_complete(now);

            let mut updated_maker = maker.clone();
            updated_maker.amount_filled += fill_qty;
            updated_maker.mark_filled_if_complete(now);
            if updated_maker.status == OrderStatus::Filled {
                book.remove_by_id(updated_maker.id);
            } else {
                let _ = book.upsert_order(updated_maker);
            }

            outcome.trades.push(trade);
        }

        outcome.taker = Some(taker.clone());
        outcome
    }
}

/// Determines whether `maker` crosses `taker`'s limit for a plain
/// `EffectiveTakerLimit`-bearing taker side. Exposed for unit tests and
/// for callers that want to preview a cross without mutating the book.
pub fn crosses(taker_side: OrderSide, taker_limit: Option<Decimal>, maker_price: Decimal) -> bool {
    match taker_limit {
        None => true,
        Some(limit) => match taker_side {
            OrderSide::Buy => maker_price <= limit,
            OrderSide::Sell => maker_price >= limit,
        },
    }
}

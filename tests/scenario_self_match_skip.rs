//! SPEC_FULL.md §8 scenario 2: a user's own resting order is never matched
//! against their own incoming order (self-trade prevention); the incoming
//! order instead rests behind it.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use synth_exchange_core::prelude::*;
use tokio_util::sync::CancellationToken;

use crate::support::{build_harness, fund_with_balance, position_with_quantity};

#[tokio::test]
async fn own_resting_order_is_skipped_by_incoming_order_from_same_user() {
    let harness = build_harness();
    let token = CancellationToken::new();

    let trader = UserId(1);
    let other_seller = UserId(2);

    harness
        .store
        .seed_position(position_with_quantity(trader, StockId(1), 1, 10));
    harness.store.seed_fund(fund_with_balance(trader, 1, dec!(1000)));
    harness
        .store
        .seed_position(position_with_quantity(other_seller, StockId(1), 2, 10));

    // trader rests a sell at 20
    let rest = harness
        .execution
        .place_and_match(
            trader,
            StockId(1),
            "USD",
            OrderSide::Sell,
            OrderType::Limit,
            dec!(20),
            Decimal::ZERO,
            5,
            None,
            &token,
        )
        .await
        .unwrap();
    assert_eq!(rest.status, ResultStatus::PlacedOnBook);

    // same trader's incoming buy at a crossing price must skip their own
    // resting sell and find no other liquidity.
    let incoming = harness
        .execution
        .place_and_match(
            trader,
            StockId(1),
            "USD",
            OrderSide::Buy,
            OrderType::Limit,
            dec!(20),
            Decimal::ZERO,
            5,
            None,
            &token,
        )
        .await
        .unwrap();
    assert_eq!(incoming.status, ResultStatus::PlacedOnBook);
    assert!(incoming.trades.is_empty());

    // a second user's sell at the same price does cross against the trader's
    // resting buy, proving the book itself still works.
    let cross = harness
        .execution
        .place_and_match(
            other_seller,
            StockId(1),
            "USD",
            OrderSide::Sell,
            OrderType::Limit,
            dec!(20),
            Decimal::ZERO,
            5,
            None,
            &token,
        )
        .await
        .unwrap();
    assert_eq!(cross.status, ResultStatus::Filled);
    assert_eq!(cross.trades.len(), 1);
    assert_eq!(cross.trades[0].buyer_id, trader);
    assert_eq!(cross.trades[0].seller_id, other_seller);
}

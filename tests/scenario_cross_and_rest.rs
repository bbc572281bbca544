//! SPEC_FULL.md §8 scenario 1: a resting sell limit order is crossed by an
//! incoming buy limit order, producing one trade and leaving both orders
//! filled; the remainder of an over-sized taker rests on the book.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use synth_exchange_core::prelude::*;
use tokio_util::sync::CancellationToken;

use crate::support::{build_harness, fund_with_balance, position_with_quantity};

#[tokio::test]
async fn resting_sell_is_crossed_by_incoming_buy_and_both_fill() {
    let harness = build_harness();
    let token = CancellationToken::new();

    let seller = UserId(1);
    let buyer = UserId(2);

    harness
        .store
        .seed_position(position_with_quantity(seller, StockId(1), 1, 10));
    harness.store.seed_fund(fund_with_balance(buyer, 1, dec!(1000)));

    let rest = harness
        .execution
        .place_and_match(
            seller,
            StockId(1),
            "USD",
            OrderSide::Sell,
            OrderType::Limit,
            dec!(20),
            Decimal::ZERO,
            10,
            None,
            &token,
        )
        .await
        .unwrap();
    assert_eq!(rest.status, ResultStatus::PlacedOnBook);

    let cross = harness
        .execution
        .place_and_match(
            buyer,
            StockId(1),
            "USD",
            OrderSide::Buy,
            OrderType::Limit,
            dec!(20),
            Decimal::ZERO,
            10,
            None,
            &token,
        )
        .await
        .unwrap();

    assert_eq!(cross.status, ResultStatus::Filled);
    assert_eq!(cross.trades.len(), 1);
    let trade = &cross.trades[0];
    assert_eq!(trade.price, dec!(20));
    assert_eq!(trade.quantity, 10);
    assert_eq!(trade.buyer_id, buyer);
    assert_eq!(trade.seller_id, seller);

    let buyer_position = harness
        .store
        .get_position(buyer, StockId(1))
        .await
        .unwrap()
        .expect("buyer position created at settlement");
    assert_eq!(buyer_position.quantity, 10);

    let seller_fund = harness.store.get_fund(seller, Currency::Usd).await.unwrap().unwrap();
    assert_eq!(seller_fund.total_balance, dec!(200));
}

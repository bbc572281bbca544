//! SPEC_FULL.md §8 scenario 4: an over-sized limit taker partially fills
//! against a smaller resting maker, the filled portion settles, and the
//! taker's own remainder rests on the book holding only the reservation it
//! still needs.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use synth_exchange_core::prelude::*;
use tokio_util::sync::CancellationToken;

use crate::support::{build_harness, fund_with_balance, position_with_quantity};

#[tokio::test]
async fn oversized_taker_partially_fills_and_rests_with_its_remaining_reservation() {
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
            dec!(10),
            Decimal::ZERO,
            10,
            None,
            &token,
        )
        .await
        .unwrap();
    assert_eq!(rest.status, ResultStatus::PlacedOnBook);

    // buyer wants 15 at 10; only 10 are resting, so 5 remain and rest.
    let buy = harness
        .execution
        .place_and_match(
            buyer,
            StockId(1),
            "USD",
            OrderSide::Buy,
            OrderType::Limit,
            dec!(10),
            Decimal::ZERO,
            15,
            None,
            &token,
        )
        .await
        .unwrap();

    assert_eq!(buy.status, ResultStatus::PartialFill);
    assert_eq!(buy.trades.len(), 1);
    assert_eq!(buy.trades[0].quantity, 10);

    let order = buy.order.expect("order present in result");
    assert_eq!(order.amount_filled, 10);
    assert_eq!(order.status, OrderStatus::Open);
    assert_eq!(order.remaining_quantity(), 5);

    // original reservation was 150 (15 * 10); 100 consumed at settlement,
    // 50 still reserved for the resting remainder.
    let buyer_fund = harness.store.get_fund(buyer, Currency::Usd).await.unwrap().unwrap();
    assert_eq!(buyer_fund.reserved_balance, dec!(50));
    assert_eq!(buyer_fund.total_balance, dec!(900));

    let seller_fund = harness.store.get_fund(seller, Currency::Usd).await.unwrap().unwrap();
    assert_eq!(seller_fund.total_balance, dec!(100));

    let open_orders = harness
        .store
        .get_open_limit_orders(StockId(1), Currency::Usd)
        .await
        .unwrap();
    assert_eq!(open_orders.len(), 1);
    assert_eq!(open_orders[0].id, order.id);
    assert_eq!(open_orders[0].remaining_quantity(), 5);
}

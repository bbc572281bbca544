//! `SettlementEngine` (SPEC_FULL.md §4.4): every state transition that must
//! be atomic across an order and its funds/positions.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::SettlementError;
use crate::ids::{FundId, PositionId};
use crate::model::{Currency, Fund, Order, OrderSide, OrderStatus, OrderType, Position, Transaction};
use crate::persistence::{Persistence, TransactionBatch};
use crate::portfolio::{FundMutation, PositionMutation};

pub struct SettlementEngine {
    persistence: Arc<dyn Persistence>,
}

/// The asset a new order must reserve before it is allowed to rest or
/// execute (SPEC_FULL.md §4.4).
enum Requirement {
    Cash(Decimal),
    Shares(u64),
}

impl SettlementEngine {
    pub fn new(persistence: Arc<dyn Persistence>) -> Self {
        Self { persistence }
    }

    fn requirement_for(order: &Order) -> Requirement {
        match order.side {
            OrderSide::Sell => Requirement::Shares(order.quantity),
            OrderSide::Buy => match order.order_type {
                OrderType::Limit => Requirement::Cash(order.price * Decimal::from(order.quantity)),
                OrderType::TrueMarket => Requirement::Cash(order.buy_budget.unwrap_or(Decimal::ZERO)),
                OrderType::SlippageMarket => {
                    let factor = Decimal::ONE + order.slippage_percent / Decimal::from(100);
                    Requirement::Cash(order.price * factor * Decimal::from(order.quantity))
                }
            },
        }
    }

    async fn load_or_new_fund(&self, order: &Order) -> Result<Fund, SettlementError> {
        if let Some(fund) = self
            .persistence
            .get_fund(order.user_id, order.currency)
            .await
            .map_err(|e| SettlementError::Persistence(e.0))?
        {
            return Ok(fund);
        }
        let id = self
            .persistence
            .next_fund_id()
            .await
            .map_err(|e| SettlementError::Persistence(e.0))?;
        Ok(Fund::new(id, order.user_id, order.currency))
    }

    async fn load_or_new_position(&self, order: &Order) -> Result<Position, SettlementError> {
        if let Some(position) = self
            .persistence
            .get_position(order.user_id, order.stock_id)
            .await
            .map_err(|e| SettlementError::Persistence(e.0))?
        {
            return Ok(position);
        }
        let id = self
            .persistence
            .next_position_id()
            .await
            .map_err(|e| SettlementError::Persistence(e.0))?;
        Ok(Position::new(id, order.user_id, order.stock_id))
    }

    /// Reserves the required asset, assigns the server-side `OrderId`, and
    /// persists the new `Open` order in one transaction.
    /// (SPEC_FULL.md §4.4 "Reservation on placement" + "Persist order".)
    pub async fn reserve_and_persist(&self, mut order: Order) -> Result<Order, SettlementError> {
        order.id = self
            .persistence
            .next_order_id()
            .await
            .map_err(|e| SettlementError::Persistence(e.0))?;

        let mut batch = TransactionBatch::default();
        match Self::requirement_for(&order) {
            Requirement::Cash(amount) => {
                let mut fund = self.load_or_new_fund(&order).await?;
                if !fund.reserve(amount) {
                    return Err(SettlementError::InsufficientFunds {
                        needed: amount,
                        available: fund.available_balance(),
                    });
                }
                batch.upsert_funds.push(fund);
            }
            Requirement::Shares(qty) => {
                let mut position = self.load_or_new_position(&order).await?;
                if !position.reserve(qty) {
                    return Err(SettlementError::InsufficientShares {
                        needed: qty,
                        available: position.available_quantity(),
                    });
                }
                batch.upsert_positions.push(position);
            }
        }
        batch.upsert_orders.push(order.clone());
        self.persistence
            .run_in_transaction(batch)
            .await
            .map_err(|e| SettlementError::Persistence(e.0))?;
        debug!(order_id = order.id.get(), "reserved and persisted new order");
        Ok(order)
    }

    /// Settles one fill: consumes the reserving side's reservation, credits
    /// the receiving side, updates both orders, and inserts the trade, all
    /// in one transaction (SPEC_FULL.md §4.4 "Settle trade").
    pub async fn settle_trade(
        &self,
        trade: &Transaction,
        buy_order: &Order,
        sell_order: &Order,
    ) -> Result<(), SettlementError> {
        let cash_amount = trade.price * Decimal::from(trade.quantity);

        let mut buyer_fund = self
            .persistence
            .get_fund(trade.buyer_id, trade.currency)
            .await
            .map_err(|e| SettlementError::Persistence(e.0))?
            .ok_or_else(|| SettlementError::Persistence("buyer fund missing at settlement".into()))?;
        if !buyer_fund.consume_reserved(cash_amount) {
            return Err(SettlementError::InsufficientFunds {
                needed: cash_amount,
                available: buyer_fund.reserved_balance,
            });
        }

        let mut buyer_position = self.load_or_new_position(buy_order).await?;
        buyer_position.add(trade.quantity);

        let mut seller_position = self
            .persistence
            .get_position(trade.seller_id, trade.stock_id)
            .await
            .map_err(|e| SettlementError::Persistence(e.0))?
            .ok_or_else(|| SettlementError::Persistence("seller position missing at settlement".into()))?;
        if !seller_position.consume_reserved(trade.quantity) {
            return Err(SettlementError::InsufficientShares {
                needed: trade.quantity,
                available: seller_position.reserved_quantity,
            });
        }

        let mut seller_fund = self.load_or_new_fund(sell_order).await?;
        seller_fund.add(cash_amount);

        let batch = TransactionBatch {
            upsert_orders: vec![buy_order.clone(), sell_order.clone()],
            insert_transactions: vec![trade.clone()],
            upsert_funds: vec![buyer_fund, seller_fund],
            upsert_positions: vec![buyer_position, seller_position],
            upsert_candles: vec![],
        };
        self.persistence
            .run_in_transaction(batch)
            .await
            .map_err(|e| SettlementError::Persistence(e.0))?;
        Ok(())
    }

    /// Releases the unused reservation proportional to `order`'s unfilled
    /// remainder and marks it `Cancelled` (SPEC_FULL.md §4.4 "Cancel
    /// remainder").
    pub async fn cancel_remainder(&self, order: &mut Order, now: DateTime<Utc>) -> Result<(), SettlementError> {
        let remaining = order.remaining_quantity();
        order.status = OrderStatus::Cancelled;
        order.updated_at = now;

        let mut batch = TransactionBatch::default();
        if remaining > 0 {
            match Self::requirement_for(order) {
                Requirement::Cash(_) => {
                    let mut fund = self.load_or_new_fund(order).await?;
                    let per_unit = match order.order_type {
                        OrderType::Limit => order.price,
                        OrderType::SlippageMarket => {
                            order.price * (Decimal::ONE + order.slippage_percent / Decimal::from(100))
                        }
                        OrderType::TrueMarket => {
                            let total = order.buy_budget.unwrap_or(Decimal::ZERO);
                            if order.quantity == 0 {
                                Decimal::ZERO
                            } else {
                                total / Decimal::from(order.quantity)
                            }
                        }
                    };
                    let release = (per_unit * Decimal::from(remaining)).min(fund.reserved_balance);
                    if release > Decimal::ZERO {
                        fund.unreserve(release);
                    }
                    batch.upsert_funds.push(fund);
                }
                Requirement::Shares(_) => {
                    let mut position = self.load_or_new_position(order).await?;
                    let release = remaining.min(position.reserved_quantity);
                    if release > 0 {
                        position.unreserve(release);
                    }
                    batch.upsert_positions.push(position);
                }
            }
        }
        batch.upsert_orders.push(order.clone());
        self.persistence
            .run_in_transaction(batch)
            .await
            .map_err(|e| SettlementError::Persistence(e.0))?;
        Ok(())
    }
}

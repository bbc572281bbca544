//! `OrderValidator` (SPEC_FULL.md §4.7): pure, synchronous checks with no
//! persistence or book access.

use rust_decimal::Decimal;

use crate::catalog::StockCatalog;
use crate::error::ValidationError;
use crate::ids::{StockId, UserId};
use crate::model::{Currency, Order, OrderType};

pub struct OrderValidator<'a> {
    catalog: &'a StockCatalog,
}

impl<'a> OrderValidator<'a> {
    pub fn new(catalog: &'a StockCatalog) -> Self {
        Self { catalog }
    }

    /// Checks applicable before an `Order` is even constructed: ids,
    /// catalog membership, currency support.
    pub fn validate_input(
        &self,
        user_id: UserId,
        stock_id: StockId,
        currency: &str,
        quantity: u64,
    ) -> Result<Currency, ValidationError> {
        if user_id.get() <= 0 {
            return Err(ValidationError::NonPositiveId {
                field: "user_id",
                value: user_id.get(),
            });
        }
        if stock_id.get() <= 0 {
            return Err(ValidationError::NonPositiveId {
                field: "stock_id",
                value: stock_id.get(),
            });
        }
        if !self.catalog.contains(stock_id) {
            return Err(ValidationError::UnknownStock(stock_id));
        }
        let parsed = Currency::parse(currency).ok_or_else(|| ValidationError::UnsupportedCurrency(currency.to_string()))?;
        if quantity == 0 {
            return Err(ValidationError::NonPositiveQuantity(quantity));
        }
        Ok(parsed)
    }

    /// Checks applicable to a fully constructed `Order`, post `validate_input`.
    pub fn validate_new(&self, order: &Order) -> Result<(), ValidationError> {
        match order.order_type {
            OrderType::Limit => {
                if order.price <= Decimal::ZERO {
                    return Err(ValidationError::NonPositiveLimitPrice(order.price));
                }
                if order.slippage_percent != Decimal::ZERO {
                    return Err(ValidationError::UnexpectedSlippage);
                }
            }
            OrderType::TrueMarket => {
                if order.price != Decimal::ZERO {
                    return Err(ValidationError::TrueMarketNonZeroPrice(order.price));
                }
                if order.slippage_percent != Decimal::ZERO {
                    return Err(ValidationError::UnexpectedSlippage);
                }
                match order.buy_budget {
                    Some(budget) if budget > Decimal::ZERO => {}
                    Some(_) => return Err(ValidationError::NonPositiveBudget),
                    None => {
                        if matches!(order.side, crate::model::OrderSide::Buy) {
                            return Err(ValidationError::NonPositiveBudget);
                        }
                    }
                }
            }
            OrderType::SlippageMarket => {
                if order.price <= Decimal::ZERO {
                    return Err(ValidationError::NonPositiveAnchorPrice(order.price));
                }
                if order.slippage_percent < Decimal::ZERO || order.slippage_percent > Decimal::from(100) {
                    return Err(ValidationError::SlippageOutOfRange(order.slippage_percent));
                }
            }
        }
        Ok(())
    }

    /// Checks for `Modify(new_quantity?, new_price?)`.
    pub fn validate_modify(
        &self,
        order: &Order,
        new_quantity: Option<u64>,
        new_price: Option<Decimal>,
    ) -> Result<(), ValidationError> {
        if new_price.is_some() && order.order_type != OrderType::Limit {
            return Err(ValidationError::PriceModifyOnNonLimit);
        }
        if let Some(price) = new_price {
            if price <= Decimal::ZERO {
                return Err(ValidationError::NonPositiveLimitPrice(price));
            }
        }
        if let Some(qty) = new_quantity {
            if qty == 0 {
                return Err(ValidationError::NonPositiveQuantity(qty));
            }
            if qty < order.amount_filled {
                return Err(ValidationError::QuantityBelowFilled {
                    new: qty,
                    filled: order.amount_filled,
                });
            }
        }
        Ok(())
    }
}

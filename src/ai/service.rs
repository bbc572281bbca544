//! `AiTradeService`: the periodic background loop that drives synthetic
//! liquidity (SPEC_FULL.md §4.10).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::config::AiLoopConfig;
use crate::execution::OrderExecutionService;
use crate::ids::AiUserId;
use crate::marketdata::MarketDataService;
use crate::model::{AiUser, Currency, OrderType};
use crate::persistence::Persistence;

use super::decision::{choose_limit_price, choose_order_type, choose_quantity, choose_side, daily_seed, DecisionInputs};

pub struct AiTradeService {
    users: Mutex<HashMap<AiUserId, AiUser>>,
    rngs: Mutex<HashMap<AiUserId, StdRng>>,
    base_seed: u64,
    config: AiLoopConfig,
    execution: Arc<OrderExecutionService>,
    market_data: Arc<MarketDataService>,
    persistence: Arc<dyn Persistence>,
    clock: Arc<dyn Clock>,
}

impl AiTradeService {
    pub fn new(
        base_seed: u64,
        config: AiLoopConfig,
        execution: Arc<OrderExecutionService>,
        market_data: Arc<MarketDataService>,
        persistence: Arc<dyn Persistence>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            rngs: Mutex::new(HashMap::new()),
            base_seed,
            config,
            execution,
            market_data,
            persistence,
            clock,
        }
    }

    pub fn register_user(&self, user: AiUser) {
        let today = self.clock.now_utc().date_naive();
        let seed = daily_seed(self.base_seed, user.id, today);
        self.rngs.lock().insert(user.id, StdRng::seed_from_u64(seed));
        self.users.lock().insert(user.id, user);
    }

    /// Runs the loop until `token` is cancelled, firing a tick every
    /// `config.tick_interval` (SPEC_FULL.md §4.10).
    pub async fn run(&self, token: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.tick_interval);
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("ai trade loop cancelled");
                    break;
                }
                _ = interval.tick() => {
                    self.tick(&token).await;
                }
            }
        }
    }

    /// One scheduler tick: daily reset, online recompute, and per-user
    /// decisions for users whose interval has elapsed.
    pub async fn tick(&self, token: &CancellationToken) {
        let now = self.clock.now_utc();
        let today = now.date_naive();

        let due_user_ids: Vec<AiUserId> = {
            let mut users = self.users.lock();
            let mut rngs = self.rngs.lock();
            let mut due = Vec::new();
            for (id, user) in users.iter_mut() {
                if user.last_daily_reset_date != Some(today) {
                    user.reset_daily_counters(today);
                    let seed = daily_seed(self.base_seed, *id, today);
                    rngs.insert(*id, StdRng::seed_from_u64(seed));
                }
                let online_roll: f64 = rngs.get_mut(id).map(|r| r.gen_range(0.0..1.0)).unwrap_or(1.0);
                user.is_enabled = Decimal::from_f64_retain(online_roll).unwrap_or(Decimal::ONE) < user.online_prob;
                if user.is_enabled && !user.daily_limits_reached() && user.is_due_for_decision(now) {
                    due.push(*id);
                }
            }
            due
        };

        for id in due_user_ids {
            if token.is_cancelled() {
                return;
            }
            self.decide_and_submit(id, now).await;
        }
    }

    async fn decide_and_submit(&self, user_id: AiUserId, now: chrono::DateTime<Utc>) {
        let (user, currency) = {
            let mut users = self.users.lock();
            let Some(user) = users.get_mut(&user_id) else { return };
            user.last_decision_at = Some(now);
            (user.clone(), Currency::Usd)
        };

        let trade_roll = {
            let mut rngs = self.rngs.lock();
            rngs.get_mut(&user_id).map(|r| r.gen_range(0.0..1.0)).unwrap_or(1.0)
        };
        if Decimal::from_f64_retain(trade_roll).unwrap_or(Decimal::ONE) > user.trade_prob {
            return;
        }

        let Some(&stock_id) = user.watchlist.iter().next() else {
            return;
        };
        let Some(quote) = self.market_data.get_quote(stock_id, currency) else {
            return;
        };
        let Some(market_price) = quote.last_price else { return };

        let fund = self.persistence.get_fund(user.user_id, currency).await.ok().flatten();
        let position = self.persistence.get_position(user.user_id, stock_id).await.ok().flatten();
        let cash_available = fund.as_ref().map(|f| f.available_balance()).unwrap_or(Decimal::ZERO);
        let cash_total = fund.as_ref().map(|f| f.total_balance).unwrap_or(Decimal::ZERO);
        let available_shares = position.as_ref().map(|p| p.available_quantity()).unwrap_or(0);
        let portfolio_value = cash_total + market_price * Decimal::from(available_shares);
        let cash_available_pct = if portfolio_value > Decimal::ZERO {
            cash_available / portfolio_value
        } else {
            Decimal::ZERO
        };

        let inputs = DecisionInputs {
            cash_available_pct,
            market_price,
            portfolio_value,
            available_shares,
        };

        let mut rngs = self.rngs.lock();
        let Some(rng) = rngs.get_mut(&user_id) else { return };
        let side = choose_side(&user, &inputs, rng);
        let order_type = choose_order_type(&user, rng);
        let jitter = Decimal::from_f64_retain(rng.gen_range(0.0..1.0)).unwrap_or(Decimal::ZERO);
        drop(rngs);

        let (price, slippage_percent, buy_budget) = match order_type {
            OrderType::Limit => (
                choose_limit_price(
                    side,
                    market_price,
                    user.min_trade_amount_prc,
                    user.max_trade_amount_prc,
                    user.aggressiveness,
                    jitter,
                ),
                Decimal::ZERO,
                None,
            ),
            OrderType::TrueMarket => (Decimal::ZERO, Decimal::ZERO, Some(cash_available * user.per_position_max_prc)),
            OrderType::SlippageMarket => (market_price, user.aggressiveness * Decimal::from(100), None),
        };

        let quantity = choose_quantity(side, &inputs, user.min_trade_amount_prc, user.per_position_max_prc, market_price);
        if quantity == 0 && order_type != OrderType::TrueMarket {
            return;
        }

        let token = CancellationToken::new();
        match self
            .execution
            .place_and_match(
                user.user_id,
                stock_id,
                "USD",
                side,
                order_type,
                price,
                slippage_percent,
                quantity.max(1),
                buy_budget,
                &token,
            )
            .await
        {
            Ok(result) => {
                debug!(user_id = user.user_id.get(), status = ?result.status, "ai order submitted");
                if let Some(mut stored) = self.users.lock().get(&user_id).cloned() {
                    stored.trades_today += 1;
                    self.users.lock().insert(user_id, stored);
                }
            }
            Err(e) => {
                debug!(user_id = user.user_id.get(), error = %e, "ai order failed");
            }
        }
    }
}

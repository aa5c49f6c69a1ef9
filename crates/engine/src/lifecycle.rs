use crate::gate::allow_sell;
use crate::state::{OrderState, TradingState, MIN_VALID_PRICE};
use crate::trigger::{Intent, TriggerEvaluator};
use configuration::StrategyConfig;
use core_types::{OrderSide, TradingPair};
use events::{EngineEvent, EventBus};
use executor::Executor;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Owns the single-order state machine: cancel on drift, open on a trigger.
///
/// Every method takes the locked `TradingState`, so decisions always see the
/// latest index and the latest reconciled account.
pub struct OrderLifecycleManager {
    executor: Arc<dyn Executor>,
    pair: TradingPair,
    strategy: StrategyConfig,
    triggers: TriggerEvaluator,
    events: EventBus,
}

impl OrderLifecycleManager {
    pub fn new(
        executor: Arc<dyn Executor>,
        pair: TradingPair,
        strategy: StrategyConfig,
        events: EventBus,
    ) -> Self {
        let triggers = TriggerEvaluator::new(strategy.buy_trigger, strategy.sell_trigger);
        Self { executor, pair, strategy, triggers, events }
    }

    /// Runs after every batch that touched the index.
    pub async fn on_index_updated(&self, state: &mut TradingState) -> Intent {
        self.check_drift(state).await;

        let intent = self
            .triggers
            .evaluate(&mut state.triggers, state.index.value(), &self.events);

        if state.order == OrderState::NoOrder {
            match intent {
                Intent::Buy => self.open_buy(state).await,
                Intent::Sell => self.open_sell(state).await,
                Intent::Hold => {}
            }
        }
        intent
    }

    async fn check_drift(&self, state: &mut TradingState) {
        let (id, ppu) = match &state.order {
            OrderState::Open { id, price, .. } => (id.clone(), *price),
            _ => return,
        };
        let last_price = state.snapshot.last_price;
        if last_price <= MIN_VALID_PRICE || ppu <= Decimal::ZERO {
            return;
        }
        let Some(ratio) = ppu.checked_div(last_price) else {
            return;
        };
        let variance = self.strategy.order_variance;
        if ratio >= Decimal::ONE - variance && ratio <= Decimal::ONE + variance {
            return;
        }

        tracing::info!(order_id = %id, %ppu, %last_price, %ratio, "Order drifted from market, cancelling.");
        self.events.emit(EngineEvent::CancelRequested { order_id: id.clone(), ratio });

        match self.executor.cancel(&id).await {
            Ok(()) => {
                tracing::info!(order_id = %id, "Confirmed cancel.");
                state.set_order_state(OrderState::CancelPending { id }, &self.events);
            }
            Err(e) => {
                tracing::error!(order_id = %id, error = %e, "Cancel failed; order stays open.");
                self.events.emit(EngineEvent::CancelFailed { order_id: id, reason: e.to_string() });
            }
        }
    }

    async fn open_buy(&self, state: &mut TradingState) {
        let last_price = state.snapshot.last_price;
        if last_price <= MIN_VALID_PRICE {
            return;
        }
        let Some(available) = self.available(state, &self.pair.quote) else {
            return;
        };
        let Some(affordable) = available.checked_div(last_price) else {
            return;
        };
        let quantity = affordable - self.strategy.buy_reserve;
        if quantity <= Decimal::ZERO {
            tracing::warn!(
                %available,
                %last_price,
                reserve = %self.strategy.buy_reserve,
                "Balance too small for a buy after the reserve."
            );
            return;
        }

        tracing::info!(%quantity, base = %self.pair.base, price = %last_price, "Placing buy order.");
        if self.place(state, OrderSide::Buy, quantity, last_price).await {
            state.snapshot.last_buy_price = last_price;
        }
    }

    async fn open_sell(&self, state: &mut TradingState) {
        let last_price = state.snapshot.last_price;
        if last_price <= Decimal::ZERO {
            return;
        }
        let Some(available) = self.available(state, &self.pair.base) else {
            return;
        };
        if !allow_sell(
            last_price,
            state.snapshot.last_buy_price,
            self.strategy.min_gain,
            self.strategy.max_loss,
        ) {
            tracing::debug!(
                %last_price,
                last_buy_price = %state.snapshot.last_buy_price,
                "Sell blocked until profit target or stop-loss."
            );
            return;
        }

        tracing::info!(quantity = %available, base = %self.pair.base, price = %last_price, "Placing sell order.");
        self.place(state, OrderSide::Sell, available, last_price).await;
    }

    /// Available balance of `currency`, if it is above the dust floor.
    fn available(&self, state: &TradingState, currency: &str) -> Option<Decimal> {
        state
            .account
            .balance(currency)
            .map(|b| b.available)
            .filter(|available| *available > self.strategy.dust_floor)
    }

    /// Places the order and moves to `Open` on success. Returns whether it was placed.
    async fn place(
        &self,
        state: &mut TradingState,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
    ) -> bool {
        match self.executor.place_limit(side, quantity, price).await {
            Ok(placed) => {
                tracing::info!(order_id = %placed.id, %side, quantity = %placed.quantity, price = %placed.price, "Confirmed order.");
                self.events.emit(EngineEvent::OrderPlaced {
                    order_id: placed.id.clone(),
                    side,
                    quantity: placed.quantity,
                    price: placed.price,
                });
                state.set_order_state(
                    OrderState::Open {
                        id: placed.id,
                        side,
                        price: placed.price,
                        quantity: placed.quantity,
                    },
                    &self.events,
                );
                true
            }
            Err(e) => {
                tracing::error!(%side, error = %e, "Order placement failed.");
                self.events.emit(EngineEvent::OrderRejected { side, reason: e.to_string() });
                false
            }
        }
    }
}

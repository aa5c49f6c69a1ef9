use core_types::OrderSide;
use events::{EngineEvent, EventBus};
use rust_decimal::Decimal;

/// What the index currently asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Buy,
    Sell,
    Hold,
}

/// Per-cycle latches so each trigger is announced once per reconciliation cycle.
/// They never gate order placement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerState {
    pub buy_trigger_active: bool,
    pub sell_trigger_active: bool,
}

impl TriggerState {
    pub fn reset(&mut self) {
        self.buy_trigger_active = false;
        self.sell_trigger_active = false;
    }
}

/// Compares the index against the buy and sell thresholds.
#[derive(Debug, Clone)]
pub struct TriggerEvaluator {
    buy_trigger: Decimal,
    sell_trigger: Decimal,
}

impl TriggerEvaluator {
    pub fn new(buy_trigger: Decimal, sell_trigger: Decimal) -> Self {
        Self { buy_trigger, sell_trigger }
    }

    pub fn evaluate(&self, state: &mut TriggerState, index: Decimal, events: &EventBus) -> Intent {
        if index > self.buy_trigger {
            if !state.buy_trigger_active {
                state.buy_trigger_active = true;
                tracing::warn!(%index, trigger = %self.buy_trigger, "BUY TRIGGER ACTIVE!");
                events.emit(EngineEvent::TriggerActivated { side: OrderSide::Buy, index });
            }
            Intent::Buy
        } else if index < self.sell_trigger {
            if !state.sell_trigger_active {
                state.sell_trigger_active = true;
                tracing::warn!(%index, trigger = %self.sell_trigger, "SELL TRIGGER ACTIVE!");
                events.emit(EngineEvent::TriggerActivated { side: OrderSide::Sell, index });
            }
            Intent::Sell
        } else {
            Intent::Hold
        }
    }
}

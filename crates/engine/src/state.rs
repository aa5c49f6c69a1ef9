use crate::index::PressureIndex;
use crate::trigger::TriggerState;
use core_types::{Balance, OpenOrder, OrderId, OrderSide, Ticker};
use events::{EngineEvent, EventBus};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Prices at or below this are treated as missing data.
pub const MIN_VALID_PRICE: Decimal = dec!(0.0000001);

/// Prices and the warm-up gate the decisions are made against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradingSnapshot {
    /// Most recent fill price or ticker last price.
    pub last_price: Decimal,
    /// Price of the most recently opened buy order, zero if none.
    pub last_buy_price: Decimal,
    /// False until the first fully successful reconciliation, and again after a failed one.
    pub ready_to_run: bool,
}

/// The lifecycle of the one order the bot may have at a time.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum OrderState {
    #[default]
    NoOrder,
    Open {
        id: OrderId,
        side: OrderSide,
        price: Decimal,
        quantity: Decimal,
    },
    CancelPending {
        id: OrderId,
    },
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderState::NoOrder => write!(f, "NoOrder"),
            OrderState::Open { id, side, price, quantity } => {
                write!(f, "Open({} {} {} @ {})", id, side, quantity, price)
            }
            OrderState::CancelPending { id } => write!(f, "CancelPending({})", id),
        }
    }
}

/// Balances, open orders and ticker as of the last successful reconciliation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountSnapshot {
    pub balances: Vec<Balance>,
    pub open_orders: Vec<OpenOrder>,
    pub ticker: Ticker,
}

impl AccountSnapshot {
    pub fn balance(&self, currency: &str) -> Option<&Balance> {
        self.balances.iter().find(|b| b.currency == currency)
    }
}

/// Everything the event path and the reconciliation poller both mutate.
///
/// It lives behind a single `Mutex` (`SharedState`) and is only ever changed
/// while that lock is held.
#[derive(Debug)]
pub struct TradingState {
    pub snapshot: TradingSnapshot,
    pub index: PressureIndex,
    pub triggers: TriggerState,
    pub order: OrderState,
    pub account: AccountSnapshot,
    /// Sequence number of the newest reconciliation tick applied so far.
    pub applied_tick: u64,
    /// Bumped on every order state transition.
    pub order_version: u64,
}

pub type SharedState = Arc<Mutex<TradingState>>;

impl TradingState {
    pub fn new(index: PressureIndex) -> Self {
        Self {
            snapshot: TradingSnapshot::default(),
            index,
            triggers: TriggerState::default(),
            order: OrderState::NoOrder,
            account: AccountSnapshot::default(),
            applied_tick: 0,
            order_version: 0,
        }
    }

    pub fn into_shared(self) -> SharedState {
        Arc::new(Mutex::new(self))
    }

    /// Folds a book event into the index using the current price and warm-up gate.
    pub fn apply_book_event(&mut self, side: OrderSide, quantity: Decimal, rate: Decimal) -> Decimal {
        self.index.update(
            side,
            quantity,
            rate,
            self.snapshot.last_price,
            self.snapshot.ready_to_run,
        )
    }

    /// Replaces the order state, logging and publishing the transition if it changed.
    pub fn set_order_state(&mut self, next: OrderState, events: &EventBus) {
        if self.order == next {
            return;
        }
        let from = std::mem::replace(&mut self.order, next);
        self.order_version += 1;
        tracing::info!(from = %from, to = %self.order, "Order state transition.");
        events.emit(EngineEvent::OrderStateChanged {
            from: from.to_string(),
            to: self.order.to_string(),
        });
    }
}

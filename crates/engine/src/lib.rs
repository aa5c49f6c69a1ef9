use crate::error::EngineError;
use crate::lifecycle::OrderLifecycleManager;
use crate::state::MIN_VALID_PRICE;
use configuration::settings::Config;
use core_types::{MarketBatch, OrderSide};
use events::EventBus;
use executor::Executor;
use std::sync::Arc;
use tokio::sync::mpsc;

pub mod error;
pub mod gate;
pub mod index;
pub mod lifecycle;
pub mod reconciler;
pub mod state;
pub mod trigger;

pub use index::PressureIndex;
pub use reconciler::ReconciliationPoller;
pub use state::{OrderState, SharedState, TradingState};
pub use trigger::Intent;

/// The central orchestrator for the live trading application.
///
/// Consumes market batches from the feed, folds them into the pressure index
/// and lets the order lifecycle act on the result. The reconciliation poller
/// shares the same `TradingState` through `state()`.
pub struct LiveEngine {
    state: SharedState,
    lifecycle: OrderLifecycleManager,
}

impl LiveEngine {
    pub fn new(config: &Config, executor: Arc<dyn Executor>, events: EventBus) -> Result<Self, EngineError> {
        let pair = config.trading_pair()?;
        let index = PressureIndex::new(
            config.strategy.order_range,
            config.strategy.index_reset_bound,
        );
        let lifecycle =
            OrderLifecycleManager::new(executor, pair, config.strategy.clone(), events);

        Ok(Self { state: TradingState::new(index).into_shared(), lifecycle })
    }

    /// Handle to the shared trading state, for the reconciliation poller.
    pub fn state(&self) -> SharedState {
        Arc::clone(&self.state)
    }

    /// Applies one batch under the state lock.
    ///
    /// Returns the intent the lifecycle acted on, or `None` when the batch held
    /// no book events or the engine is still warming up.
    pub async fn process_batch(&self, batch: &MarketBatch) -> Option<Intent> {
        let mut state = self.state.lock().await;

        for event in &batch.buys {
            state.apply_book_event(OrderSide::Buy, event.quantity, event.rate);
        }
        for event in &batch.sells {
            state.apply_book_event(OrderSide::Sell, event.quantity, event.rate);
        }
        for fill in &batch.fills {
            if fill.rate > MIN_VALID_PRICE {
                state.snapshot.last_price = fill.rate;
            }
        }

        if !batch.has_book_events() || !state.snapshot.ready_to_run {
            return None;
        }

        tracing::debug!(
            index = %state.index.value(),
            high = %state.index.high(),
            low = %state.index.low(),
            last_price = %state.snapshot.last_price,
            "Index updated."
        );
        Some(self.lifecycle.on_index_updated(&mut state).await)
    }

    /// The main event loop. Starts the poller and runs until the feed closes.
    pub async fn run(
        &self,
        mut feed: mpsc::Receiver<MarketBatch>,
        poller: Arc<ReconciliationPoller>,
    ) -> Result<(), EngineError> {
        let reconciler = poller.start();
        tracing::info!("Engine is running. Waiting for market data...");

        while let Some(batch) = feed.recv().await {
            self.process_batch(&batch).await;
        }

        reconciler.abort();
        tracing::error!("Market feed ended unexpectedly.");
        Err(EngineError::FeedClosed)
    }
}

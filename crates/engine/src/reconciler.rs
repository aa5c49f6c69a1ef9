use crate::state::{AccountSnapshot, OrderState, SharedState, TradingState, MIN_VALID_PRICE};
use api_client::error::ApiError;
use api_client::{ApiClient, IdentityResolver};
use configuration::settings::Config;
use core_types::{OpenOrder, TradingPair};
use events::{EngineEvent, EventBus, SnapshotSummary};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};

/// The periodic "source of truth" pass for the live engine.
///
/// On every tick it pulls balances, open orders and the ticker from the
/// exchange, overwrites the local view with them, closes the index cycle and
/// re-derives the order state. It also watches the public network identity and
/// asks the market feed to resubscribe when it changes.
///
/// Ticks run as independent tasks so a slow exchange never delays the next
/// one; each tick carries a sequence number and results older than the last
/// applied tick are discarded.
pub struct ReconciliationPoller {
    state: SharedState,
    api: Arc<dyn ApiClient>,
    identity: Arc<dyn IdentityResolver>,
    resubscribe: Arc<Notify>,
    pair: TradingPair,
    interval: Duration,
    retry_attempts: u32,
    retry_base: Duration,
    events: EventBus,
    last_identity: Mutex<Option<String>>,
    ticks: AtomicU64,
}

impl ReconciliationPoller {
    pub fn new(
        state: SharedState,
        api: Arc<dyn ApiClient>,
        identity: Arc<dyn IdentityResolver>,
        pair: TradingPair,
        config: &Config,
        events: EventBus,
    ) -> Self {
        Self {
            state,
            api,
            identity,
            resubscribe: Arc::new(Notify::new()),
            pair,
            interval: config.reconciliation.interval(),
            retry_attempts: config.network.identity_retry_attempts,
            retry_base: config.network.identity_retry_base(),
            events,
            last_identity: Mutex::new(None),
            ticks: AtomicU64::new(0),
        }
    }

    /// Signalled whenever the network identity changes. The market feed waits on it.
    pub fn resubscribe_signal(&self) -> Arc<Notify> {
        self.resubscribe.clone()
    }

    /// Spawns the timer loop. The first tick fires immediately.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(interval = ?self.interval, "Starting reconciliation poller.");
            let mut timer = interval(self.interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                timer.tick().await;
                let seq = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;
                let poller = Arc::clone(&self);
                tokio::spawn(async move { poller.run_cycle(seq).await });
            }
        })
    }

    /// One full tick: reconcile, then check the network identity.
    pub async fn run_cycle(&self, seq: u64) {
        self.reconcile(seq).await;
        self.check_identity().await;
    }

    /// Fetches the exchange state without holding the lock, then applies it atomically.
    ///
    /// If the order state moved while the fetch was in flight, the fetched open
    /// orders may predate that move, so the local order is kept and the next
    /// tick rebuilds it.
    pub async fn reconcile(&self, seq: u64) {
        let order_version = self.state.lock().await.order_version;
        let fetched = self.fetch_account().await;

        let mut state = self.state.lock().await;
        if seq <= state.applied_tick {
            tracing::debug!(seq, applied = state.applied_tick, "Discarding stale reconciliation result.");
            return;
        }
        state.applied_tick = seq;

        match fetched {
            Ok(account) => {
                let order_moved = state.order_version != order_version;
                self.apply_account_snapshot(&mut state, account, order_moved)
            }
            Err(e) => {
                tracing::error!(seq, error = %e, "Reconciliation failed; pausing trading until the next good tick.");
                state.snapshot.ready_to_run = false;
                self.events.emit(EngineEvent::ReconciliationFailed { reason: e.to_string() });
            }
        }
    }

    async fn fetch_account(&self) -> Result<AccountSnapshot, ApiError> {
        let (balances, open_orders, ticker) = tokio::join!(
            self.api.get_balances(),
            self.api.get_open_orders(&self.pair),
            self.api.get_ticker(&self.pair)
        );
        Ok(AccountSnapshot { balances: balances?, open_orders: open_orders?, ticker: ticker? })
    }

    /// Publishes the closing snapshot of the cycle, then starts a fresh one.
    fn apply_account_snapshot(
        &self,
        state: &mut TradingState,
        account: AccountSnapshot,
        order_moved: bool,
    ) {
        if account.ticker.last > MIN_VALID_PRICE {
            state.snapshot.last_price = account.ticker.last;
        }

        let summary = SnapshotSummary {
            last_price: state.snapshot.last_price,
            bid: account.ticker.bid,
            ask: account.ticker.ask,
            index: state.index.value(),
            high_index: state.index.high(),
            low_index: state.index.low(),
            balances: account.balances.clone(),
            open_orders: account.open_orders.clone(),
        };
        tracing::info!(
            pair = %self.pair,
            last = %summary.last_price,
            bid = %summary.bid,
            ask = %summary.ask,
            index = %summary.index,
            high = %summary.high_index,
            low = %summary.low_index,
            open_orders = summary.open_orders.len(),
            "Reconciled account."
        );
        for balance in summary.balances.iter().filter(|b| !b.total.is_zero()) {
            tracing::debug!(currency = %balance.currency, available = %balance.available, total = %balance.total, "Balance.");
        }
        self.events.emit(EngineEvent::Snapshot(summary));

        state.index.reset_value();
        state.triggers.reset();

        if order_moved {
            tracing::info!(order = %state.order, "Order changed during the fetch; keeping local order state.");
        } else {
            let next = order_state_from(&account.open_orders);
            state.set_order_state(next, &self.events);
        }
        state.account = account;
        state.snapshot.ready_to_run = true;
    }

    /// Resolves the current identity and signals a resubscribe if it changed.
    /// Failure to resolve is logged and otherwise ignored.
    pub async fn check_identity(&self) {
        let Some(current) = self.resolve_identity().await else {
            return;
        };

        let mut last = self.last_identity.lock().await;
        match last.replace(current.clone()) {
            None => tracing::info!(identity = %current, "Recorded network identity."),
            Some(previous) if previous != current => {
                tracing::warn!(%previous, %current, "Network identity changed, resubscribing market feed.");
                self.events.emit(EngineEvent::ResubscribeRequested { previous, current });
                self.resubscribe.notify_waiters();
            }
            Some(_) => {}
        }
    }

    async fn resolve_identity(&self) -> Option<String> {
        let mut delay = self.retry_base;
        for attempt in 1..=self.retry_attempts {
            match self.identity.current_identity().await {
                Ok(identity) => return Some(identity),
                Err(e) => {
                    tracing::warn!(attempt, max = self.retry_attempts, error = %e, "Identity lookup failed.");
                    if attempt < self.retry_attempts {
                        sleep(delay).await;
                        delay = delay.saturating_mul(2);
                    }
                }
            }
        }
        tracing::error!("Could not resolve network identity, skipping check this cycle.");
        None
    }
}

fn order_state_from(open_orders: &[OpenOrder]) -> OrderState {
    let Some(order) = open_orders.first() else {
        return OrderState::NoOrder;
    };
    if open_orders.len() > 1 {
        tracing::warn!(count = open_orders.len(), tracking = %order.id, "More than one open order on the pair; tracking the first.");
    }
    OrderState::Open {
        id: order.id.clone(),
        side: order.side,
        price: order.price,
        quantity: order.quantity_remaining,
    }
}

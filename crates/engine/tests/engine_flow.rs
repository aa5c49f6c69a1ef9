use api_client::error::ApiError;
use api_client::{ApiClient, IdentityResolver};
use async_trait::async_trait;
use core_types::{
    Balance, MarketBatch, MarketEvent, OpenOrder, OrderId, OrderSide, Ticker, TradingPair,
};
use engine::error::EngineError;
use engine::{Intent, LiveEngine, OrderState, ReconciliationPoller};
use events::{EngineEvent, EventBus};
use executor::{Executor, ExecutorError, PlacedOrder};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

const CONFIG: &str = r#"
[pair]
base = "VTC"
quote = "BTC"

[network]
identity_retry_attempts = 1
identity_retry_base_ms = 1
"#;

/// In-memory exchange account.
struct FakeExchange {
    balances: Mutex<Vec<Balance>>,
    open_orders: Mutex<Vec<OpenOrder>>,
    ticker: Mutex<Ticker>,
    open_orders_delay: Mutex<Option<Duration>>,
    balances_down: Mutex<bool>,
}

impl FakeExchange {
    fn new() -> Self {
        Self {
            balances: Mutex::new(vec![
                Balance { currency: "BTC".into(), available: dec!(1), total: dec!(1) },
                Balance { currency: "VTC".into(), available: Decimal::ZERO, total: Decimal::ZERO },
            ]),
            open_orders: Mutex::new(Vec::new()),
            ticker: Mutex::new(Ticker { last: dec!(0.0001), bid: dec!(0.0000999), ask: dec!(0.0001001) }),
            open_orders_delay: Mutex::new(None),
            balances_down: Mutex::new(false),
        }
    }
}

#[async_trait]
impl ApiClient for FakeExchange {
    async fn place_limit(
        &self,
        _pair: &TradingPair,
        _side: OrderSide,
        _quantity: Decimal,
        _price: Decimal,
    ) -> Result<OrderId, ApiError> {
        Err(ApiError::InvalidData("orders go through the executor".into()))
    }

    async fn cancel(&self, _pair: &TradingPair, _order_id: &OrderId) -> Result<(), ApiError> {
        Err(ApiError::InvalidData("orders go through the executor".into()))
    }

    async fn get_balances(&self) -> Result<Vec<Balance>, ApiError> {
        if *self.balances_down.lock().unwrap() {
            return Err(ApiError::Exchange { code: -1001, msg: "Internal error".into() });
        }
        Ok(self.balances.lock().unwrap().clone())
    }

    async fn get_open_orders(&self, _pair: &TradingPair) -> Result<Vec<OpenOrder>, ApiError> {
        let snapshot = self.open_orders.lock().unwrap().clone();
        let delay = *self.open_orders_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(snapshot)
    }

    async fn get_ticker(&self, _pair: &TradingPair) -> Result<Ticker, ApiError> {
        Ok(self.ticker.lock().unwrap().clone())
    }
}

struct FixedIdentity;

#[async_trait]
impl IdentityResolver for FixedIdentity {
    async fn current_identity(&self) -> Result<String, ApiError> {
        Ok("192.0.2.10".to_string())
    }
}

#[derive(Default)]
struct RecordingExecutor {
    placed: Mutex<Vec<PlacedOrder>>,
    cancelled: Mutex<Vec<OrderId>>,
}

#[async_trait]
impl Executor for RecordingExecutor {
    async fn place_limit(
        &self,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<PlacedOrder, ExecutorError> {
        let mut placed = self.placed.lock().unwrap();
        let order = PlacedOrder {
            id: OrderId::new(format!("{}", placed.len() + 1)),
            side,
            price,
            quantity,
        };
        placed.push(order.clone());
        Ok(order)
    }

    async fn cancel(&self, order_id: &OrderId) -> Result<(), ExecutorError> {
        self.cancelled.lock().unwrap().push(order_id.clone());
        Ok(())
    }
}

struct Harness {
    engine: LiveEngine,
    poller: Arc<ReconciliationPoller>,
    exchange: Arc<FakeExchange>,
    executor: Arc<RecordingExecutor>,
    events: EventBus,
}

fn harness() -> Harness {
    let config = configuration::load_config_from_str(CONFIG).unwrap();
    let exchange = Arc::new(FakeExchange::new());
    let executor = Arc::new(RecordingExecutor::default());
    let events = EventBus::default();

    let engine = LiveEngine::new(&config, executor.clone(), events.clone()).unwrap();
    let poller = Arc::new(ReconciliationPoller::new(
        engine.state(),
        exchange.clone(),
        Arc::new(FixedIdentity),
        config.trading_pair().unwrap(),
        &config,
        events.clone(),
    ));

    Harness { engine, poller, exchange, executor, events }
}

fn bids(quantity: Decimal, rate: Decimal) -> MarketBatch {
    MarketBatch { buys: vec![MarketEvent::buy(quantity, rate)], ..Default::default() }
}

#[tokio::test]
async fn nothing_trades_before_the_first_reconciliation() {
    let h = harness();

    assert_eq!(h.engine.process_batch(&bids(dec!(9000), dec!(0.0001))).await, None);

    let state = h.engine.state();
    assert_eq!(state.lock().await.index.value(), Decimal::ZERO);
    assert!(h.executor.placed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn buy_pressure_opens_drifts_and_reconciles() {
    let h = harness();
    let mut rx = h.events.subscribe();
    h.poller.run_cycle(1).await;

    // 6000 units bid at the market push the index over the buy trigger.
    let intent = h.engine.process_batch(&bids(dec!(6000), dec!(0.0001))).await;
    assert_eq!(intent, Some(Intent::Buy));
    {
        let placed = h.executor.placed.lock().unwrap();
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].side, OrderSide::Buy);
        // 1 BTC / 0.0001 - 5 reserve
        assert_eq!(placed[0].quantity, dec!(9995));
        assert_eq!(placed[0].price, dec!(0.0001));
    }

    // A trade 3% higher moves the market away from the resting order.
    let batch = MarketBatch {
        buys: vec![MarketEvent::buy(dec!(1), dec!(0.000103))],
        fills: vec![MarketEvent::fill(OrderSide::Buy, dec!(50), dec!(0.000103))],
        ..Default::default()
    };
    h.engine.process_batch(&batch).await;
    assert_eq!(h.executor.cancelled.lock().unwrap().as_slice(), &[OrderId::new("1")]);

    let state = h.engine.state();
    {
        let s = state.lock().await;
        assert_eq!(s.order, OrderState::CancelPending { id: OrderId::new("1") });
        assert_eq!(s.snapshot.last_price, dec!(0.000103));
        assert_eq!(s.snapshot.last_buy_price, dec!(0.0001));
    }
    // Still above the trigger, but one order at a time.
    assert_eq!(h.executor.placed.lock().unwrap().len(), 1);

    // The exchange confirms the cancel: no open orders at the next tick.
    h.poller.run_cycle(2).await;
    {
        let s = state.lock().await;
        assert_eq!(s.order, OrderState::NoOrder);
        assert_eq!(s.index.value(), Decimal::ZERO);
        assert!(!s.triggers.buy_trigger_active);
    }

    let mut saw_trigger = false;
    let mut saw_snapshot = false;
    while let Ok(record) = rx.try_recv() {
        match record.event {
            EngineEvent::TriggerActivated { side: OrderSide::Buy, .. } => saw_trigger = true,
            EngineEvent::Snapshot(_) => saw_snapshot = true,
            _ => {}
        }
    }
    assert!(saw_trigger && saw_snapshot);
}

#[tokio::test]
async fn sell_pressure_is_held_until_profit() {
    let h = harness();
    *h.exchange.balances.lock().unwrap() = vec![Balance {
        currency: "VTC".into(),
        available: dec!(9995),
        total: dec!(9995),
    }];
    h.poller.run_cycle(1).await;
    h.engine.state().lock().await.snapshot.last_buy_price = dec!(0.0001);

    let asks = MarketBatch { sells: vec![MarketEvent::sell(dec!(6000), dec!(0.0001))], ..Default::default() };
    assert_eq!(h.engine.process_batch(&asks).await, Some(Intent::Sell));
    assert!(h.executor.placed.lock().unwrap().is_empty());

    // 3% above the buy price clears the profit target.
    let batch = MarketBatch {
        sells: vec![MarketEvent::sell(dec!(1), dec!(0.000103))],
        fills: vec![MarketEvent::fill(OrderSide::Sell, dec!(5), dec!(0.000103))],
        ..Default::default()
    };
    h.engine.process_batch(&batch).await;
    // The order now rests at the market; repeated pressure adds nothing.
    h.engine.process_batch(&batch).await;

    let placed = h.executor.placed.lock().unwrap();
    assert_eq!(placed.len(), 1);
    assert_eq!(placed[0].side, OrderSide::Sell);
    assert_eq!(placed[0].quantity, dec!(9995));
    assert_eq!(placed[0].price, dec!(0.000103));
}

#[tokio::test]
async fn resting_order_is_adopted_from_the_exchange() {
    let h = harness();
    *h.exchange.open_orders.lock().unwrap() = vec![OpenOrder {
        id: OrderId::new("42"),
        side: OrderSide::Buy,
        price: dec!(0.0001),
        quantity: dec!(100),
        quantity_remaining: dec!(60),
    }];
    h.poller.run_cycle(1).await;

    h.engine.process_batch(&bids(dec!(6000), dec!(0.0001))).await;

    assert!(h.executor.placed.lock().unwrap().is_empty());
    assert!(matches!(
        h.engine.state().lock().await.order,
        OrderState::Open { ref id, .. } if *id == OrderId::new("42")
    ));
}

#[tokio::test]
async fn order_placed_during_a_slow_tick_survives_it() {
    let h = harness();
    h.poller.run_cycle(1).await;
    *h.exchange.open_orders_delay.lock().unwrap() = Some(Duration::from_millis(200));

    // The tick reads an empty order book before the engine places anything.
    let poller = h.poller.clone();
    let tick = tokio::spawn(async move { poller.reconcile(2).await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let batch = bids(dec!(6000), dec!(0.0001));
    assert_eq!(h.engine.process_batch(&batch).await, Some(Intent::Buy));
    assert_eq!(h.executor.placed.lock().unwrap().len(), 1);

    tick.await.unwrap();
    let state = h.engine.state();
    {
        let s = state.lock().await;
        assert_eq!(s.applied_tick, 2);
        assert!(matches!(s.order, OrderState::Open { ref id, .. } if *id == OrderId::new("1")));
        assert_eq!(s.snapshot.last_buy_price, dec!(0.0001));
    }

    h.engine.process_batch(&batch).await;
    assert_eq!(h.executor.placed.lock().unwrap().len(), 1);

    // The next tick sees the order on the exchange and adopts it.
    *h.exchange.open_orders_delay.lock().unwrap() = None;
    *h.exchange.open_orders.lock().unwrap() = vec![OpenOrder {
        id: OrderId::new("1"),
        side: OrderSide::Buy,
        price: dec!(0.0001),
        quantity: dec!(9995),
        quantity_remaining: dec!(9995),
    }];
    h.poller.run_cycle(3).await;
    assert!(matches!(
        state.lock().await.order,
        OrderState::Open { ref id, .. } if *id == OrderId::new("1")
    ));
}

#[tokio::test]
async fn failed_tick_pauses_trading_until_the_next_good_one() {
    let h = harness();
    let mut rx = h.events.subscribe();
    h.poller.run_cycle(1).await;

    *h.exchange.balances_down.lock().unwrap() = true;
    h.poller.run_cycle(2).await;

    let state = h.engine.state();
    assert!(!state.lock().await.snapshot.ready_to_run);
    let batch = bids(dec!(6000), dec!(0.0001));
    assert_eq!(h.engine.process_batch(&batch).await, None);
    assert_eq!(state.lock().await.index.value(), Decimal::ZERO);
    assert!(h.executor.placed.lock().unwrap().is_empty());

    let mut saw_failure = false;
    while let Ok(record) = rx.try_recv() {
        if matches!(record.event, EngineEvent::ReconciliationFailed { .. }) {
            saw_failure = true;
        }
    }
    assert!(saw_failure);

    *h.exchange.balances_down.lock().unwrap() = false;
    h.poller.run_cycle(3).await;
    assert_eq!(h.engine.process_batch(&batch).await, Some(Intent::Buy));
    assert_eq!(state.lock().await.index.value(), dec!(6000));
    assert_eq!(h.executor.placed.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn run_returns_when_the_feed_closes() {
    let h = harness();
    let (tx, feed) = mpsc::channel(8);
    tx.send(bids(dec!(10), dec!(0.0001))).await.unwrap();
    drop(tx);

    let result = h.engine.run(feed, h.poller.clone()).await;
    assert!(matches!(result, Err(EngineError::FeedClosed)));
}

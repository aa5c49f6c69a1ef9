use crate::error::ExecutorError;
use api_client::ApiClient;
use async_trait::async_trait;
use configuration::PairConfig;
use core_types::{OrderId, OrderSide, TradingPair};
use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::Arc;
use uuid::Uuid;

/// Rounds a price to the number of decimal places the pair accepts.
fn round_price(price: Decimal, precision: u32) -> Decimal {
    price.round_dp_with_strategy(precision, RoundingStrategy::MidpointNearestEven)
}

/// Rounds a quantity down so we never commit more than the balance allows.
fn round_quantity(quantity: Decimal, precision: u32) -> Decimal {
    quantity.round_dp_with_strategy(precision, RoundingStrategy::ToZero)
}

/// What was actually sent to the exchange after rounding.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedOrder {
    pub id: OrderId,
    pub side: OrderSide,
    pub price: Decimal,
    pub quantity: Decimal,
}

/// A generic trait for an execution engine.
///
/// This trait allows the engine to be agnostic about whether it is talking to
/// the real exchange or only pretending to.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Places a limit order for the configured pair.
    async fn place_limit(
        &self,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<PlacedOrder, ExecutorError>;

    /// Cancels a resting order.
    async fn cancel(&self, order_id: &OrderId) -> Result<(), ExecutorError>;
}

/// The "live" executor that sends real orders to the exchange via the ApiClient.
pub struct LiveExecutor {
    api_client: Arc<dyn ApiClient>,
    pair: TradingPair,
    price_precision: u32,
    quantity_precision: u32,
}

impl LiveExecutor {
    pub fn new(api_client: Arc<dyn ApiClient>, pair: TradingPair, pair_config: &PairConfig) -> Self {
        Self {
            api_client,
            pair,
            price_precision: pair_config.price_precision,
            quantity_precision: pair_config.quantity_precision,
        }
    }
}

#[async_trait]
impl Executor for LiveExecutor {
    async fn place_limit(
        &self,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<PlacedOrder, ExecutorError> {
        let price = round_price(price, self.price_precision);
        if price <= Decimal::ZERO {
            return Err(ExecutorError::InvalidPrice(price.to_string()));
        }
        let rounded = round_quantity(quantity, self.quantity_precision);
        if rounded <= Decimal::ZERO {
            return Err(ExecutorError::InvalidQuantity {
                requested: quantity.to_string(),
                rounded: rounded.to_string(),
            });
        }

        tracing::debug!(%side, %rounded, %price, pair = %self.pair, "LiveExecutor: placing limit order.");
        let id = self.api_client.place_limit(&self.pair, side, rounded, price).await?;

        Ok(PlacedOrder { id, side, price, quantity: rounded })
    }

    async fn cancel(&self, order_id: &OrderId) -> Result<(), ExecutorError> {
        tracing::debug!(%order_id, pair = %self.pair, "LiveExecutor: cancelling order.");
        self.api_client.cancel(&self.pair, order_id).await?;
        Ok(())
    }
}

/// Accepts every order without contacting the exchange.
pub struct PaperExecutor {
    price_precision: u32,
    quantity_precision: u32,
}

impl PaperExecutor {
    pub fn new(pair_config: &PairConfig) -> Self {
        Self {
            price_precision: pair_config.price_precision,
            quantity_precision: pair_config.quantity_precision,
        }
    }
}

#[async_trait]
impl Executor for PaperExecutor {
    async fn place_limit(
        &self,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<PlacedOrder, ExecutorError> {
        let price = round_price(price, self.price_precision);
        let rounded = round_quantity(quantity, self.quantity_precision);
        if rounded <= Decimal::ZERO {
            return Err(ExecutorError::InvalidQuantity {
                requested: quantity.to_string(),
                rounded: rounded.to_string(),
            });
        }
        let id = OrderId::new(format!("paper-{}", Uuid::new_v4()));
        tracing::info!(%id, %side, quantity = %rounded, %price, "PAPER order accepted (not sent).");
        Ok(PlacedOrder { id, side, price, quantity: rounded })
    }

    async fn cancel(&self, order_id: &OrderId) -> Result<(), ExecutorError> {
        tracing::info!(%order_id, "PAPER cancel accepted (not sent).");
        Ok(())
    }
}

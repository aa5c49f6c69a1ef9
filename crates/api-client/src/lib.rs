use crate::auth::sign_request;
use crate::error::ApiError;
use async_trait::async_trait;
use chrono::Utc;
use configuration::{ApiConfig, NetworkConfig};
use core_types::{Balance, OpenOrder, OrderId, OrderSide, Ticker, TradingPair};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

mod auth;
pub mod error;
pub mod identity;
pub mod live_connector;
pub mod responses;
// --- Public API ---
pub use identity::{HttpIdentityResolver, IdentityResolver};
pub use live_connector::LiveConnector;
pub use responses::{
    AccountResponse, ApiErrorResponse, BalanceResponse, CancelResponse, OpenOrderResponse,
    OrderResponse, TickerResponse,
};

/// The generic, abstract interface for a trading exchange API client.
/// This trait is the contract the engine uses, allowing the
/// underlying implementation (live or mock) to be swapped out.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Places a good-till-cancelled limit order. (Authenticated)
    async fn place_limit(
        &self,
        pair: &TradingPair,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<OrderId, ApiError>;

    /// Cancels a resting order. (Authenticated)
    async fn cancel(&self, pair: &TradingPair, order_id: &OrderId) -> Result<(), ApiError>;

    /// Fetches the balance of every asset on the account. (Authenticated)
    async fn get_balances(&self) -> Result<Vec<Balance>, ApiError>;

    /// Fetches the orders currently resting on the book for `pair`. (Authenticated)
    async fn get_open_orders(&self, pair: &TradingPair) -> Result<Vec<OpenOrder>, ApiError>;

    /// Fetches last/bid/ask for `pair`.
    async fn get_ticker(&self, pair: &TradingPair) -> Result<Ticker, ApiError>;
}

/// A concrete implementation of the `ApiClient` for the Binance spot exchange.
#[derive(Clone)]
pub struct BinanceClient {
    client: reqwest::Client,
    base_url: String,

    api_secret: String,
}

impl BinanceClient {
    /// Every request made through this client is bounded by `network.request_timeout_secs`.
    pub fn new(api_config: &ApiConfig, network: &NetworkConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "X-MBX-APIKEY",
            HeaderValue::from_str(&api_config.key)
                .map_err(|e| ApiError::InvalidData(format!("Invalid API key: {}", e)))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(network.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: api_config.rest_url.trim_end_matches('/').to_string(),
            api_secret: api_config.secret.clone(),
        })
    }

    async fn signed<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        mut params: BTreeMap<&str, String>,
    ) -> Result<T, ApiError> {
        params.insert("timestamp", Utc::now().timestamp_millis().to_string());

        let query_string =
            serde_qs::to_string(&params).map_err(|e| ApiError::InvalidData(e.to_string()))?;
        let signature = sign_request(&self.api_secret, &query_string)?;

        let url = format!(
            "{}{}?{}&signature={}",
            self.base_url, path, query_string, signature
        );

        tracing::debug!(%method, path, "Sending signed request.");
        let response = self.client.request(method, &url).send().await?;
        Self::decode(response).await
    }

    async fn public<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).query(params).send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            serde_json::from_str::<T>(&text).map_err(|e| ApiError::Deserialization(e.to_string()))
        } else {
            let api_error: ApiErrorResponse = serde_json::from_str(&text).map_err(|e| {
                ApiError::Deserialization(format!(
                    "Failed to deserialize error response ({}): {}. Original text: {}",
                    status, e, text
                ))
            })?;
            Err(ApiError::Exchange { code: api_error.code, msg: api_error.msg })
        }
    }
}

#[async_trait]
impl ApiClient for BinanceClient {
    async fn place_limit(
        &self,
        pair: &TradingPair,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<OrderId, ApiError> {
        let mut params = BTreeMap::new();
        params.insert("symbol", pair.symbol());
        params.insert("side", side.as_str().to_string());
        params.insert("type", "LIMIT".to_string());
        params.insert("timeInForce", "GTC".to_string());
        params.insert("quantity", quantity.normalize().to_string());
        params.insert("price", price.normalize().to_string());
        params.insert("newClientOrderId", uuid::Uuid::new_v4().simple().to_string());

        let response: OrderResponse = self.signed(Method::POST, "/api/v3/order", params).await?;
        tracing::debug!(?response, "Order accepted by exchange.");
        Ok(OrderId::new(response.order_id.to_string()))
    }

    async fn cancel(&self, pair: &TradingPair, order_id: &OrderId) -> Result<(), ApiError> {
        let mut params = BTreeMap::new();
        params.insert("symbol", pair.symbol());
        params.insert("orderId", order_id.to_string());

        let response: CancelResponse = self.signed(Method::DELETE, "/api/v3/order", params).await?;
        tracing::debug!(?response, "Cancel accepted by exchange.");
        Ok(())
    }

    async fn get_balances(&self) -> Result<Vec<Balance>, ApiError> {
        let account: AccountResponse = self
            .signed(Method::GET, "/api/v3/account", BTreeMap::new())
            .await?;
        Ok(account.balances.into_iter().map(Balance::from).collect())
    }

    async fn get_open_orders(&self, pair: &TradingPair) -> Result<Vec<OpenOrder>, ApiError> {
        let mut params = BTreeMap::new();
        params.insert("symbol", pair.symbol());
        let orders: Vec<OpenOrderResponse> =
            self.signed(Method::GET, "/api/v3/openOrders", params).await?;
        Ok(orders.into_iter().map(OpenOrder::from).collect())
    }

    async fn get_ticker(&self, pair: &TradingPair) -> Result<Ticker, ApiError> {
        let ticker: TickerResponse = self
            .public("/api/v3/ticker/24hr", &[("symbol", pair.symbol())])
            .await?;
        Ok(ticker.into())
    }
}

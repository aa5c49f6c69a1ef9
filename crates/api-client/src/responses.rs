use core_types::{Balance, OpenOrder, OrderId, OrderSide, Ticker};
use rust_decimal::Decimal;
use serde::Deserialize;

// Using `#[serde(rename_all = "camelCase")]` to automatically map from JSON camelCase to Rust snake_case.

/// The response from a successful `POST /api/v3/order` request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub symbol: String,
    pub order_id: i64,
    pub client_order_id: String,
    pub price: Decimal,
    pub orig_qty: Decimal,
    pub executed_qty: Decimal,
    pub status: String,
    pub side: OrderSide,
}

/// The response from `DELETE /api/v3/order`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub symbol: String,
    pub order_id: i64,
    pub status: String,
}

/// `GET /api/v3/account`; only the balances are of interest.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountResponse {
    pub balances: Vec<BalanceResponse>,
}

/// A single asset's balance. `free` is what can be committed to new orders.
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceResponse {
    pub asset: String,
    pub free: Decimal,
    pub locked: Decimal,
}

impl From<BalanceResponse> for Balance {
    fn from(b: BalanceResponse) -> Self {
        Balance {
            currency: b.asset,
            available: b.free,
            total: b.free + b.locked,
        }
    }
}

/// A single entry of `GET /api/v3/openOrders`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenOrderResponse {
    pub symbol: String,
    pub order_id: i64,
    pub price: Decimal,
    pub orig_qty: Decimal,
    pub executed_qty: Decimal,
    pub side: OrderSide,
}

impl From<OpenOrderResponse> for OpenOrder {
    fn from(o: OpenOrderResponse) -> Self {
        OpenOrder {
            id: OrderId::new(o.order_id.to_string()),
            side: o.side,
            price: o.price,
            quantity: o.orig_qty,
            quantity_remaining: o.orig_qty - o.executed_qty,
        }
    }
}

/// `GET /api/v3/ticker/24hr` for a single symbol.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerResponse {
    pub last_price: Decimal,
    pub bid_price: Decimal,
    pub ask_price: Decimal,
}

impl From<TickerResponse> for Ticker {
    fn from(t: TickerResponse) -> Self {
        Ticker { last: t.last_price, bid: t.bid_price, ask: t.ask_price }
    }
}

/// Represents an error response from the Binance API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub code: i64,
    pub msg: String,
}

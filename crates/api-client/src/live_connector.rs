use crate::error::ApiError;
use configuration::{ApiConfig, NetworkConfig};
use core_types::{MarketBatch, MarketEvent, OrderSide, TradingPair};
use futures_util::stream::StreamExt;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

// --- WebSocket Deserialization Structs ---
#[derive(Debug, Deserialize)]
struct WsStreamWrapper {
    stream: String,
    data: WsMarketEvent,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "e")]
enum WsMarketEvent {
    #[serde(rename = "depthUpdate")]
    Depth(WsDepthUpdate),
    #[serde(rename = "trade")]
    Trade(WsTrade),
}

/// A diff-depth update. Each level is `[price, quantity]`; a zero quantity
/// means the level was removed.
#[derive(Debug, Deserialize)]
struct WsDepthUpdate {
    #[serde(rename = "b")]
    bids: Vec<(Decimal, Decimal)>,
    #[serde(rename = "a")]
    asks: Vec<(Decimal, Decimal)>,
}

#[derive(Debug, Deserialize)]
struct WsTrade {
    #[serde(rename = "p")]
    price: Decimal,
    #[serde(rename = "q")]
    quantity: Decimal,
    /// True when the buyer was the resting order, i.e. the taker sold.
    #[serde(rename = "m")]
    buyer_is_maker: bool,
}

/// Turns one combined-stream frame into a batch. Bids become buy events, asks
/// become sell events and trades become fills.
pub fn parse_stream_message(text: &str) -> Result<MarketBatch, ApiError> {
    let wrapper: WsStreamWrapper =
        serde_json::from_str(text).map_err(|e| ApiError::Deserialization(e.to_string()))?;
    tracing::trace!(stream = %wrapper.stream, "Stream frame received.");

    let mut batch = MarketBatch::default();
    match wrapper.data {
        WsMarketEvent::Depth(depth) => {
            batch.buys = depth
                .bids
                .into_iter()
                .map(|(rate, quantity)| MarketEvent::buy(quantity, rate))
                .collect();
            batch.sells = depth
                .asks
                .into_iter()
                .map(|(rate, quantity)| MarketEvent::sell(quantity, rate))
                .collect();
        }
        WsMarketEvent::Trade(trade) => {
            let side = if trade.buyer_is_maker { OrderSide::Sell } else { OrderSide::Buy };
            batch.fills.push(MarketEvent::fill(side, trade.quantity, trade.price));
        }
    }
    Ok(batch)
}

/// Handles connection to the Binance WebSocket API and keeps the market subscription alive.
pub struct LiveConnector {
    base_url: Url,
    connect_timeout: Duration,
    reconnect_delay: Duration,
}

impl LiveConnector {
    pub fn new(api: &ApiConfig, network: &NetworkConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(&api.ws_url)
            .map_err(|e| ApiError::InvalidData(format!("Invalid WebSocket URL '{}': {}", api.ws_url, e)))?;
        Ok(Self {
            base_url,
            connect_timeout: network.request_timeout(),
            reconnect_delay: network.reconnect_delay(),
        })
    }

    fn stream_url(&self, pair: &TradingPair) -> Url {
        let symbol = pair.symbol().to_lowercase();
        let mut url = self.base_url.clone();
        url.set_path("/stream");
        url.set_query(Some(&format!("streams={0}@depth/{0}@trade", symbol)));
        url
    }

    /// Subscribes to book deltas and trades for `pair` and returns a channel of batches.
    ///
    /// A background task owns the connection. Whenever the socket closes, errors,
    /// or `resubscribe` is notified with `notify_waiters` while connected, the task
    /// drops the connection and reconnects after `reconnect_delay`. It exits only
    /// when the receiver is dropped.
    pub fn subscribe_market(
        &self,
        pair: &TradingPair,
        resubscribe: Arc<Notify>,
    ) -> mpsc::Receiver<MarketBatch> {
        let (tx, rx) = mpsc::channel(1024);
        let url = self.stream_url(pair);
        let connect_timeout = self.connect_timeout;
        let reconnect_delay = self.reconnect_delay;

        tracing::debug!("WebSocket URL: {}", url);

        tokio::spawn(async move {
            loop {
                tracing::info!("Connecting to market stream...");
                match tokio::time::timeout(connect_timeout, connect_async(url.as_str())).await {
                    Ok(Ok((mut stream, _))) => {
                        tracing::info!("Market stream connection established.");
                        // Only requests made while this connection is up count.
                        let resubscribed = resubscribe.notified();
                        tokio::pin!(resubscribed);
                        resubscribed.as_mut().enable();
                        loop {
                            tokio::select! {
                                _ = &mut resubscribed => {
                                    tracing::info!("Resubscribe requested. Dropping current connection.");
                                    break;
                                }
                                msg = stream.next() => match msg {
                                    Some(Ok(Message::Text(text))) => match parse_stream_message(&text) {
                                        Ok(batch) if batch.is_empty() => {}
                                        Ok(batch) => {
                                            if tx.send(batch).await.is_err() {
                                                tracing::info!("Market receiver dropped. Closing WebSocket connection.");
                                                return;
                                            }
                                        }
                                        Err(e) => {
                                            tracing::debug!(error = %e, "Ignoring unrecognised stream message.");
                                        }
                                    },
                                    Some(Ok(Message::Close(frame))) => {
                                        tracing::info!("WebSocket connection closed: {:?}", frame);
                                        break;
                                    }
                                    Some(Ok(_)) => {}
                                    Some(Err(e)) => {
                                        tracing::error!("WebSocket message error: {}", e);
                                        break;
                                    }
                                    None => break,
                                }
                            }
                        }
                    }
                    Ok(Err(e)) => {
                        tracing::error!(error = %e, "WebSocket connection error.");
                    }
                    Err(_) => {
                        tracing::error!(
                            timeout_secs = connect_timeout.as_secs(),
                            "WebSocket handshake timed out."
                        );
                    }
                }
                if tx.is_closed() {
                    return;
                }
                tracing::warn!(
                    "Market stream disconnected. Reconnecting in {}s...",
                    reconnect_delay.as_secs()
                );
                tokio::time::sleep(reconnect_delay).await;
            }
        });

        rx
    }
}

use crate::enums::{MarketEventKind, OrderSide};
use crate::error::CoreError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The exchange-assigned identifier of an order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A BASE/QUOTE trading pair. BASE is bought and sold, QUOTE is the pricing currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingPair {
    pub base: String,
    pub quote: String,
}

impl TradingPair {
    pub fn new(base: &str, quote: &str) -> Result<Self, CoreError> {
        let base = base.trim().to_uppercase();
        let quote = quote.trim().to_uppercase();
        if base.is_empty() {
            return Err(CoreError::InvalidInput("base".into(), "symbol is empty".into()));
        }
        if quote.is_empty() {
            return Err(CoreError::InvalidInput("quote".into(), "symbol is empty".into()));
        }
        if base == quote {
            return Err(CoreError::InvalidInput(
                "pair".into(),
                format!("base and quote are both {}", base),
            ));
        }
        Ok(Self { base, quote })
    }

    /// The concatenated exchange symbol, e.g. `VTCBTC`.
    pub fn symbol(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }
}

impl fmt::Display for TradingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.quote, self.base)
    }
}

/// A single order-book delta or fill from the live feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketEvent {
    pub kind: MarketEventKind,
    /// For book deltas this mirrors `kind`; for fills it is the taker side.
    pub side: OrderSide,
    pub quantity: Decimal,
    /// Price of one unit of base, in quote.
    pub rate: Decimal,
}

impl MarketEvent {
    pub fn buy(quantity: Decimal, rate: Decimal) -> Self {
        Self { kind: MarketEventKind::Buy, side: OrderSide::Buy, quantity, rate }
    }

    pub fn sell(quantity: Decimal, rate: Decimal) -> Self {
        Self { kind: MarketEventKind::Sell, side: OrderSide::Sell, quantity, rate }
    }

    pub fn fill(side: OrderSide, quantity: Decimal, rate: Decimal) -> Self {
        Self { kind: MarketEventKind::Fill, side, quantity, rate }
    }
}

/// Everything the feed delivered in one message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketBatch {
    pub buys: Vec<MarketEvent>,
    pub sells: Vec<MarketEvent>,
    pub fills: Vec<MarketEvent>,
}

impl MarketBatch {
    pub fn is_empty(&self) -> bool {
        self.buys.is_empty() && self.sells.is_empty() && self.fills.is_empty()
    }

    /// True if the batch carries book deltas, i.e. it can move the index.
    pub fn has_book_events(&self) -> bool {
        !self.buys.is_empty() || !self.sells.is_empty()
    }
}

/// An account balance for one currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub currency: String,
    pub available: Decimal,
    pub total: Decimal,
}

/// An order resting on the exchange, as reported by the open-orders endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenOrder {
    pub id: OrderId,
    pub side: OrderSide,
    pub price: Decimal,
    pub quantity: Decimal,
    pub quantity_remaining: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub last: Decimal,
    pub bid: Decimal,
    pub ask: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn pair_normalises_symbols() {
        let pair = TradingPair::new(" vtc", "btc ").unwrap();
        assert_eq!(pair.symbol(), "VTCBTC");
        assert_eq!(pair.to_string(), "BTC-VTC");
    }

    #[test]
    fn pair_rejects_empty_and_identical_symbols() {
        assert!(TradingPair::new("", "BTC").is_err());
        assert!(TradingPair::new("BTC", " ").is_err());
        assert!(TradingPair::new("btc", "BTC").is_err());
    }

    #[test]
    fn batch_reports_book_events() {
        let mut batch = MarketBatch::default();
        assert!(batch.is_empty());

        batch.fills.push(MarketEvent::fill(OrderSide::Sell, dec!(1), dec!(100)));
        assert!(!batch.is_empty());
        assert!(!batch.has_book_events());

        batch.sells.push(MarketEvent::sell(dec!(2), dec!(101)));
        assert!(batch.has_book_events());
        assert_eq!(batch.sells[0].kind, MarketEventKind::Sell);
    }
}

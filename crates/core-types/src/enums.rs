use serde::{Deserialize, Serialize};
use std::fmt;

/// Exchanges spell sides in upper case on the wire ("BUY" / "SELL").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which part of the live feed a `MarketEvent` came from.
///
/// `Buy` and `Sell` are order-book deltas (resting bids and asks), `Fill` is an
/// executed trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketEventKind {
    Buy,
    Sell,
    Fill,
}

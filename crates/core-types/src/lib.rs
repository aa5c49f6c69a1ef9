pub mod enums;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{MarketEventKind, OrderSide};
pub use error::CoreError;
pub use structs::{Balance, MarketBatch, MarketEvent, OpenOrder, OrderId, Ticker, TradingPair};

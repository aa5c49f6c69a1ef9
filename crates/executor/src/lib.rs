//! # Pulse Executor Crate
//!
//! This crate is the thin layer between the engine's decisions and the exchange.
//! It defines a generic `Executor` trait and two implementations:
//!
//! - `LiveExecutor`: rounds prices and quantities to what the pair allows and
//!   forwards limit orders and cancels to an `ApiClient`.
//! - `PaperExecutor`: logs what would have been sent and returns synthetic order
//!   ids, for running the strategy against live data without trading.
//!
//! The engine never talks to the `ApiClient` directly for order placement, so it
//! is agnostic about whether orders are real.

// Declare the modules that constitute this crate.
pub mod error;
pub mod exchange;

// Re-export the key components to provide a clean, public-facing API.
pub use error::ExecutorError;
pub use exchange::{Executor, LiveExecutor, PaperExecutor, PlacedOrder};

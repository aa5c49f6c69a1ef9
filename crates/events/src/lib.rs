//! # Pulse Events
//!
//! This crate defines the structured observability events the engine publishes:
//! trigger activations, order placements and cancels, order-state transitions,
//! reconciliation summaries and resubscription requests.
//!
//! As a Layer 0 crate, it depends only on `core-types`.

// Declare the modules that make up this crate.
pub mod bus;
pub mod error;
pub mod messages;

// Re-export the core types to provide a clean public API.
pub use bus::EventBus;
pub use error::EventsError;
pub use messages::{EngineEvent, EventRecord, SnapshotSummary};

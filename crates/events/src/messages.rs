use crate::error::EventsError;
use chrono::{DateTime, Utc};
use core_types::{Balance, OpenOrder, OrderId, OrderSide};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Periodic view of the trading state, published by every successful reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub last_price: Decimal,
    pub bid: Decimal,
    pub ask: Decimal,
    pub index: Decimal,
    pub high_index: Decimal,
    pub low_index: Decimal,
    pub balances: Vec<Balance>,
    pub open_orders: Vec<OpenOrder>,
}

/// Everything the engine reports about itself.
///
/// The `#[serde(tag = "type", content = "payload")]` attribute serializes each
/// variant into a `{"type": ..., "payload": ...}` object, e.g.
/// `{"type":"TriggerActivated","payload":{"side":"BUY","index":"5120.5"}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum EngineEvent {
    /// The index crossed a trigger threshold for the first time this cycle.
    TriggerActivated { side: OrderSide, index: Decimal },
    OrderPlaced { order_id: OrderId, side: OrderSide, quantity: Decimal, price: Decimal },
    OrderRejected { side: OrderSide, reason: String },
    /// An open order drifted away from the market and a cancel was sent.
    CancelRequested { order_id: OrderId, ratio: Decimal },
    CancelFailed { order_id: OrderId, reason: String },
    OrderStateChanged { from: String, to: String },
    Snapshot(SnapshotSummary),
    /// A reconciliation fetch failed; trading is paused until the next good one.
    ReconciliationFailed { reason: String },
    ResubscribeRequested { previous: String, current: String },
}

/// An `EngineEvent` stamped with the time it was emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub timestamp: DateTime<Utc>,
    pub event: EngineEvent,
}

impl EventRecord {
    pub fn now(event: EngineEvent) -> Self {
        Self { timestamp: Utc::now(), event }
    }

    pub fn to_json(&self) -> Result<String, EventsError> {
        serde_json::to_string(self).map_err(|e| EventsError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn events_serialize_with_type_tag() {
        let record = EventRecord::now(EngineEvent::TriggerActivated {
            side: OrderSide::Buy,
            index: dec!(5120.5),
        });
        let json: serde_json::Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();
        assert_eq!(json["event"]["type"], "TriggerActivated");
        assert_eq!(json["event"]["payload"]["side"], "BUY");
        assert_eq!(json["event"]["payload"]["index"], "5120.5");
    }
}

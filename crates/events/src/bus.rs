use crate::messages::{EngineEvent, EventRecord};
use tokio::sync::broadcast;

/// Fan-out of engine events to any number of listeners.
///
/// Publishing never blocks and never fails: with no subscribers the event is
/// simply dropped, and slow subscribers see `RecvError::Lagged`.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EventRecord>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(EventRecord::now(event));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_emitted_events() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        bus.emit(EngineEvent::ReconciliationFailed { reason: "timeout".into() });

        let record = rx.recv().await.unwrap();
        assert_eq!(
            record.event,
            EngineEvent::ReconciliationFailed { reason: "timeout".into() }
        );
    }

    #[test]
    fn emitting_without_subscribers_is_fine() {
        EventBus::new(4).emit(EngineEvent::OrderStateChanged {
            from: "NoOrder".into(),
            to: "NoOrder".into(),
        });
    }
}

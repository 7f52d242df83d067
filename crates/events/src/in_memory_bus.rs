//! In-memory message bus for tests/dev.

use std::sync::{Mutex, mpsc};

use crate::bus::{MessagePublisher, PublishError, Subscription};
use crate::envelope::EventEnvelope;

/// In-memory pub/sub bus.
///
/// - No IO
/// - Best-effort fan-out to every live subscription
/// - Dead subscribers are dropped while publishing
#[derive(Debug, Default)]
pub struct InMemoryMessageBus {
    subscribers: Mutex<Vec<mpsc::Sender<EventEnvelope>>>,
}

impl InMemoryMessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription<EventEnvelope> {
        let (tx, rx) = mpsc::channel();

        // If the lock is poisoned, we still return a subscription;
        // it just won't receive messages until the process restarts.
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }

        Subscription::new(rx)
    }
}

#[async_trait::async_trait]
impl MessagePublisher for InMemoryMessageBus {
    async fn publish(&self, event: EventEnvelope) -> Result<(), PublishError> {
        let mut subs = self.subscribers.lock().map_err(|_| PublishError::Closed)?;

        subs.retain(|tx| tx.send(event.clone()).is_ok());

        tracing::debug!(
            event_type = event.event_type(),
            subscribers = subs.len(),
            "published domain event"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn envelope(n: u64) -> EventEnvelope {
        EventEnvelope::new(
            Uuid::now_v7(),
            "test",
            "key",
            "test.happened",
            Utc::now(),
            json!({ "n": n }),
        )
    }

    #[tokio::test]
    async fn every_subscription_receives_events_in_order() {
        let bus = InMemoryMessageBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.publish(envelope(1)).await.unwrap();
        bus.publish(envelope(2)).await.unwrap();

        for sub in [a, b] {
            let got: Vec<_> = sub.drain().into_iter().map(|e| e.payload()["n"].clone()).collect();
            assert_eq!(got, vec![json!(1), json!(2)]);
        }
    }

    #[tokio::test]
    async fn dropped_subscriptions_do_not_fail_publish() {
        let bus = InMemoryMessageBus::new();
        drop(bus.subscribe());

        assert!(bus.publish(envelope(1)).await.is_ok());
        assert!(bus.subscribers.lock().unwrap().is_empty());
    }
}

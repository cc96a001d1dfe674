//! Typed pub/sub event bus. `publish` is fire-and-forget: each handler
//! runs as its own task so a slow or failing handler never blocks the
//! producer or any other subscriber.

use crate::event::{EventEnvelope, EventType, ProcessEvent};
use async_trait::async_trait;
use dashmap::DashMap;
use pe_domain::ExecutionId;
use parking_lot::RwLock;
use std::sync::Arc;

/// A subscriber. Handlers are expected to be cheap to clone (wrap state in
/// `Arc`) since the bus holds one `Arc<dyn EventHandler>` per registration.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: EventEnvelope) -> anyhow::Result<()>;
}

#[derive(Default)]
pub struct EventBus {
    by_type: DashMap<EventType, Vec<Arc<dyn EventHandler>>>,
    global: RwLock<Vec<Arc<dyn EventHandler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for one concrete event type.
    pub fn subscribe(&self, event_type: EventType, handler: Arc<dyn EventHandler>) {
        self.by_type.entry(event_type).or_default().push(handler);
    }

    /// Registers a handler that receives every event regardless of type.
    pub fn subscribe_all(&self, handler: Arc<dyn EventHandler>) {
        self.global.write().push(handler);
    }

    /// Dispatches `event` to every interested handler. Returns as soon as the
    /// handler tasks are spawned; it does not wait for them to finish.
    pub fn publish(&self, execution_id: ExecutionId, event: ProcessEvent) {
        let envelope = EventEnvelope::new(execution_id, event);
        let event_type = envelope.event_type();

        let mut targets: Vec<Arc<dyn EventHandler>> = self
            .by_type
            .get(&event_type)
            .map(|v| v.clone())
            .unwrap_or_default();
        targets.extend(self.global.read().iter().cloned());

        for handler in targets {
            let envelope = envelope.clone();
            tokio::spawn(async move {
                if let Err(e) = handler.handle(envelope).await {
                    tracing::error!(error = %e, "event handler failed");
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ProcessEvent;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingHandler(Arc<AtomicUsize>);

    #[async_trait]
    impl EventHandler for CountingHandler {
        async fn handle(&self, _event: EventEnvelope) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl EventHandler for FailingHandler {
        async fn handle(&self, _event: EventEnvelope) -> anyhow::Result<()> {
            anyhow::bail!("boom")
        }
    }

    #[tokio::test]
    async fn dispatches_to_typed_and_global_handlers() {
        let bus = EventBus::new();
        let typed_count = Arc::new(AtomicUsize::new(0));
        let global_count = Arc::new(AtomicUsize::new(0));

        bus.subscribe(
            EventType::StepCompleted,
            Arc::new(CountingHandler(typed_count.clone())),
        );
        bus.subscribe_all(Arc::new(CountingHandler(global_count.clone())));

        bus.publish(
            ExecutionId::new(),
            ProcessEvent::StepCompleted {
                step_id: pe_domain::StepId::new("a"),
                output: serde_json::json!({}),
            },
        );

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(typed_count.load(Ordering::SeqCst), 1);
        assert_eq!(global_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn a_failing_handler_does_not_affect_others() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe_all(Arc::new(FailingHandler));
        bus.subscribe_all(Arc::new(CountingHandler(count.clone())));

        bus.publish(ExecutionId::new(), ProcessEvent::ProcessCancelled { reason: "x".into() });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}

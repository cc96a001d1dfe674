//! Live-stream publisher: serializes every event to the JSON envelope
//! connected clients expect and hands it to a host-supplied broadcast
//! callback. Authenticating or routing those clients is out of scope here.

use crate::bus::EventHandler;
use crate::event::EventEnvelope;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// Anything that can fan a serialized message out to connected clients
/// (a WebSocket hub, an SSE broadcaster, a test sink).
pub trait Broadcaster: Send + Sync {
    fn broadcast(&self, message: String);
}

// `ProcessEvent` is internally tagged with `event_type`, so flattening
// it here already contributes that field to the wire envelope alongside the
// variant's own payload fields.
#[derive(Serialize)]
struct WireEnvelope<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    timestamp: chrono::DateTime<chrono::Utc>,
    execution_id: String,
    #[serde(flatten)]
    payload: &'a Value,
}

pub struct LiveStreamPublisher<B: Broadcaster> {
    broadcaster: B,
}

impl<B: Broadcaster> LiveStreamPublisher<B> {
    pub fn new(broadcaster: B) -> Self {
        Self { broadcaster }
    }
}

#[async_trait]
impl<B: Broadcaster> EventHandler for LiveStreamPublisher<B> {
    async fn handle(&self, event: EventEnvelope) -> anyhow::Result<()> {
        let payload = serde_json::to_value(&event.event)?;
        let envelope = WireEnvelope {
            kind: "process_event",
            timestamp: event.timestamp,
            execution_id: event.execution_id.to_string(),
            payload: &payload,
        };
        let message = serde_json::to_string(&envelope)?;
        self.broadcaster.broadcast(message);
        Ok(())
    }
}

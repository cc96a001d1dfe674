//! The `Broadcaster` the live-stream publisher hands every event envelope
//! to. Backed by a `tokio::sync::broadcast` channel so any number of
//! `/events` clients can subscribe independently; a client that falls behind
//! drops the oldest messages rather than stalling the producer.

use pe_events::Broadcaster;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct SseBroadcaster {
    sender: broadcast::Sender<String>,
}

impl SseBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.sender.subscribe()
    }
}

impl Broadcaster for SseBroadcaster {
    fn broadcast(&self, message: String) {
        // No connected clients is not an error; the event is simply dropped.
        let _ = self.sender.send(message);
    }
}

//! Typed event bus and publishers turning execution state changes into
//! real-time notifications.

pub mod bus;
pub mod event;
pub mod live_stream;
pub mod webhook;

pub use bus::{EventBus, EventHandler};
pub use event::{EventEnvelope, EventType, ProcessEvent};
pub use live_stream::{Broadcaster, LiveStreamPublisher};
pub use webhook::{WebhookConfig, WebhookPublisher};

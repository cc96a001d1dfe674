//! Channel adapters and the informed-notification sink.
//!
//! Slack/webhook/email delivery is an external collaborator; this crate only
//! defines the contract. An "informed notification write to an NDJSON
//! file" pattern becomes the `Notifier` sink below — one implementation may
//! append JSON lines to a durable path, another may deliver over a message
//! channel. The engine only knows `Notifier::notify`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pe_domain::{StepDefinition, StepId};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("notification delivery failed: {0}")]
pub struct NotificationError(pub String);

/// A channel adapter for the `notification` step type. Each variant
/// (`slack`, `email`, `webhook`) is a distinct implementation
/// behind this trait; the handler picks one by `NotificationChannel`.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    async fn deliver(
        &self,
        message: &str,
        subject: Option<&str>,
        recipients: &[String],
        webhook_url: Option<&str>,
    ) -> Result<DateTime<Utc>, NotificationError>;
}

/// Sink for `informed` role notifications: fired
/// after a step completes for every agent/user listed as informed on that
/// step. Distinct from `ChannelAdapter`, which backs the `notification` step
/// type itself.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, step: &StepDefinition, event: &str, context: &serde_json::Value);
}

/// A `Notifier` that does nothing; the default when no informed sink is
/// configured.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _step: &StepDefinition, _event: &str, _context: &serde_json::Value) {}
}

/// Helper used by the engine to build the notification context payload
/// handed to `Notifier::notify` after a step completes.
pub fn informed_context(step_id: &StepId, output: &serde_json::Value) -> serde_json::Value {
    serde_json::json!({ "step_id": step_id.as_str(), "output": output })
}

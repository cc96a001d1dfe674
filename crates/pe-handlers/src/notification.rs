//! The `notification` step handler.

use crate::context::{StepContext, StepHandler, StepResult};
use crate::expr::ExpressionEvaluator;
use crate::notifier::ChannelAdapter;
use async_trait::async_trait;
use pe_domain::{ErrorCode, StepConfig, StepType};
use std::collections::HashMap;
use std::sync::Arc;

/// Dispatches to the `ChannelAdapter` registered for the step's configured
/// `NotificationChannel` (`slack`, `email`, `webhook`).
pub struct NotificationHandler {
    channels: HashMap<&'static str, Arc<dyn ChannelAdapter>>,
    expr: ExpressionEvaluator,
}

impl NotificationHandler {
    pub fn new(channels: HashMap<&'static str, Arc<dyn ChannelAdapter>>) -> Self {
        Self { channels, expr: ExpressionEvaluator::new() }
    }
}

#[async_trait]
impl StepHandler for NotificationHandler {
    fn step_type(&self) -> StepType {
        StepType::Notification
    }

    async fn execute(&self, ctx: &StepContext, config: &StepConfig) -> StepResult {
        let StepConfig::Notification { channel, message, subject, recipients, webhook_url } = config
        else {
            return StepResult::fail(
                "notification handler received a non-notification config",
                ErrorCode::InvalidConfig,
            );
        };

        let key = match channel {
            pe_domain::NotificationChannel::Slack => "slack",
            pe_domain::NotificationChannel::Email => "email",
            pe_domain::NotificationChannel::Webhook => "webhook",
        };

        let Some(adapter) = self.channels.get(key) else {
            return StepResult::fail(format!("no adapter configured for channel '{key}'"), ErrorCode::NotificationFailed);
        };

        let message = self.expr.substitute(message, ctx);
        let subject = subject.as_deref().map(|s| self.expr.substitute(s, ctx));

        match adapter.deliver(&message, subject.as_deref(), recipients, webhook_url.as_deref()).await {
            Ok(delivered_at) => StepResult::ok(serde_json::json!({
                "channel": key,
                "delivered_at": delivered_at,
            })),
            Err(e) => StepResult::fail(format!("notification delivery failed: {e}"), ErrorCode::NotificationFailed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::NotificationError;
    use chrono::{DateTime, Utc};
    use pe_domain::{ExecutionId, NotificationChannel, StepDefinition, StepId};

    struct OkAdapter;
    #[async_trait]
    impl ChannelAdapter for OkAdapter {
        async fn deliver(
            &self,
            _message: &str,
            _subject: Option<&str>,
            _recipients: &[String],
            _webhook_url: Option<&str>,
        ) -> Result<DateTime<Utc>, NotificationError> {
            Ok(Utc::now())
        }
    }

    struct FailingAdapter;
    #[async_trait]
    impl ChannelAdapter for FailingAdapter {
        async fn deliver(
            &self,
            _message: &str,
            _subject: Option<&str>,
            _recipients: &[String],
            _webhook_url: Option<&str>,
        ) -> Result<DateTime<Utc>, NotificationError> {
            Err(NotificationError("rate limited".into()))
        }
    }

    fn ctx(channel: NotificationChannel) -> StepContext {
        let config = StepConfig::Notification {
            channel,
            message: "hello {{input.name}}".into(),
            subject: None,
            recipients: vec![],
            webhook_url: None,
        };
        let step = StepDefinition {
            id: StepId::new("notify"),
            name: None,
            config,
            dependencies: Default::default(),
            condition: None,
            retry_policy: Default::default(),
            error_policy: Default::default(),
            compensation: None,
            roles: None,
            timeout: None,
        };
        StepContext {
            execution_id: ExecutionId::new(),
            process_name: "p".into(),
            process_version: "1.0".into(),
            step_definition: step,
            step_outputs: HashMap::new(),
            input_data: serde_json::json!({"name": "ops"}),
        }
    }

    #[tokio::test]
    async fn delivers_via_configured_channel() {
        let mut channels: HashMap<&'static str, Arc<dyn ChannelAdapter>> = HashMap::new();
        channels.insert("slack", Arc::new(OkAdapter));
        let handler = NotificationHandler::new(channels);
        let c = ctx(NotificationChannel::Slack);
        let result = handler.execute(&c, &c.step_definition.config).await;
        match result {
            StepResult::Ok { output, .. } => assert_eq!(output["channel"], "slack"),
            other => panic!("expected ok, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_channel_adapter_fails() {
        let handler = NotificationHandler::new(HashMap::new());
        let c = ctx(NotificationChannel::Email);
        let result = handler.execute(&c, &c.step_definition.config).await;
        assert!(matches!(result, StepResult::Fail { error_code: ErrorCode::NotificationFailed, .. }));
    }

    #[tokio::test]
    async fn adapter_failure_surfaces_as_notification_failed() {
        let mut channels: HashMap<&'static str, Arc<dyn ChannelAdapter>> = HashMap::new();
        channels.insert("webhook", Arc::new(FailingAdapter));
        let handler = NotificationHandler::new(channels);
        let c = ctx(NotificationChannel::Webhook);
        let result = handler.execute(&c, &c.step_definition.config).await;
        assert!(matches!(result, StepResult::Fail { error_code: ErrorCode::NotificationFailed, .. }));
    }
}

//! The `AgentGateway` collaborator: the engine only
//! calls this trait, the actual agent runtime lives elsewhere.

use async_trait::async_trait;
use pe_domain::{Money, TokenUsage};
use serde_json::Value;

#[derive(Debug, Clone, thiserror::Error)]
pub enum AgentGatewayError {
    #[error("agent '{0}' is not available")]
    Unavailable(String),
    #[error("agent call failed: {0}")]
    CallFailed(String),
}

#[derive(Debug, Clone)]
pub struct AgentResponse {
    pub response: Value,
    pub cost: Option<Money>,
    pub token_usage: Option<TokenUsage>,
}

/// The agent execution runtime, as seen by the agent-task handler.
/// Implementations live outside this crate; tests supply a scripted fake.
#[async_trait]
pub trait AgentGateway: Send + Sync {
    /// Whether `agent` is currently known/running.
    async fn is_available(&self, agent: &str) -> bool;

    /// Sends `message` to `agent` and awaits its reply.
    async fn send_message(
        &self,
        agent: &str,
        message: &str,
        model: Option<&str>,
        temperature: Option<f64>,
    ) -> Result<AgentResponse, AgentGatewayError>;
}

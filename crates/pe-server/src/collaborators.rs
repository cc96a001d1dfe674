//! Stub implementations of collaborators that live outside this crate (the
//! agent execution runtime, notification side channels). A deployment with a
//! real agent runtime or Slack/webhook/email integration supplies its own
//! `AgentGateway`/`ChannelAdapter`s to [`crate::bootstrap::Collaborators`];
//! these stand in for a from-scratch `cargo run` with neither configured.

use async_trait::async_trait;
use pe_handlers::{AgentGateway, AgentGatewayError, AgentResponse};

/// An `AgentGateway` that reports every agent unavailable. Used when no real
/// agent runtime is wired up; `agent_task` steps fail fast with
/// `AGENT_UNAVAILABLE` (retryable) instead of hanging.
pub struct UnavailableAgentGateway;

#[async_trait]
impl AgentGateway for UnavailableAgentGateway {
    async fn is_available(&self, _agent: &str) -> bool {
        false
    }

    async fn send_message(
        &self,
        agent: &str,
        _message: &str,
        _model: Option<&str>,
        _temperature: Option<f64>,
    ) -> Result<AgentResponse, AgentGatewayError> {
        Err(AgentGatewayError::Unavailable(agent.to_string()))
    }
}

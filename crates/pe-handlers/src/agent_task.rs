//! The `agent_task` step handler.

use crate::agent_gateway::AgentGateway;
use crate::circuit_breaker::CircuitBreaker;
use crate::context::{StepContext, StepResult};
use crate::expr::ExpressionEvaluator;
use async_trait::async_trait;
use pe_domain::{ErrorCode, StepConfig, StepType};
use std::sync::Arc;
use std::time::Duration;

/// Default circuit breaker tuning: three consecutive `AGENT_UNAVAILABLE`
/// failures trip the breaker open for 30s.
const DEFAULT_FAILURE_THRESHOLD: u32 = 3;
const DEFAULT_RECOVERY_TIMEOUT: Duration = Duration::from_secs(30);

pub struct AgentTaskHandler {
    gateway: Arc<dyn AgentGateway>,
    breaker: CircuitBreaker,
    expr: ExpressionEvaluator,
}

impl AgentTaskHandler {
    pub fn new(gateway: Arc<dyn AgentGateway>) -> Self {
        Self {
            gateway,
            breaker: CircuitBreaker::new(
                "agent-gateway",
                DEFAULT_FAILURE_THRESHOLD,
                DEFAULT_RECOVERY_TIMEOUT,
            ),
            expr: ExpressionEvaluator::new(),
        }
    }
}

#[async_trait]
impl crate::context::StepHandler for AgentTaskHandler {
    fn step_type(&self) -> StepType {
        StepType::AgentTask
    }

    async fn execute(&self, ctx: &StepContext, config: &StepConfig) -> StepResult {
        let StepConfig::AgentTask { agent, message, model, temperature_millis, .. } = config
        else {
            return StepResult::fail("agent_task handler received a non-agent_task config", ErrorCode::InvalidConfig);
        };

        let agent = self.expr.substitute(agent, ctx);
        let message = self.expr.substitute(message, ctx);

        if !self.breaker.should_allow() {
            tracing::warn!(agent = %agent, "agent-task circuit breaker open, failing fast");
            return StepResult::fail(
                format!("agent '{agent}' unavailable: circuit breaker open"),
                ErrorCode::AgentUnavailable,
            );
        }

        if !self.gateway.is_available(&agent).await {
            self.breaker.record_failure();
            return StepResult::fail(format!("agent '{agent}' is not available"), ErrorCode::AgentUnavailable);
        }

        let temperature = temperature_millis.map(|t| t as f64 / 1000.0);
        match self.gateway.send_message(&agent, &message, model.as_deref(), temperature).await {
            Ok(response) => {
                self.breaker.record_success();
                let output = serde_json::json!({
                    "response": response.response,
                    "agent": agent,
                    "cost": response.cost.map(|c| c.as_decimal()),
                    "token_usage": response.token_usage.as_ref().map(|t| serde_json::json!({
                        "prompt_tokens": t.prompt_tokens,
                        "completion_tokens": t.completion_tokens,
                    })),
                });
                match response.token_usage {
                    Some(usage) => StepResult::ok_with_usage(output, response.cost, usage),
                    None => match response.cost {
                        Some(cost) => StepResult::ok_with_cost(output, cost),
                        None => StepResult::ok(output),
                    },
                }
            }
            Err(crate::agent_gateway::AgentGatewayError::Unavailable(agent)) => {
                self.breaker.record_failure();
                StepResult::fail(format!("agent '{agent}' unavailable"), ErrorCode::AgentUnavailable)
            }
            Err(crate::agent_gateway::AgentGatewayError::CallFailed(e)) => {
                self.breaker.record_failure();
                StepResult::fail(format!("agent call failed: {e}"), ErrorCode::AgentUnavailable)
            }
        }
    }
}

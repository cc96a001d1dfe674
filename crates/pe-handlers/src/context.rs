//! The uniform handler contract: `StepContext` in, `StepResult` out.

use async_trait::async_trait;
use pe_domain::{ErrorCode, ExecutionId, Money, StepDefinition, StepId, StepType, TokenUsage};
use serde_json::Value;
use std::collections::HashMap;

/// Everything a handler needs to execute one step, assembled fresh on every
/// dispatch (including retries) by the engine.
#[derive(Debug, Clone)]
pub struct StepContext {
    pub execution_id: ExecutionId,
    pub process_name: String,
    pub process_version: String,
    pub step_definition: StepDefinition,
    pub step_outputs: HashMap<StepId, Value>,
    pub input_data: Value,
}

impl StepContext {
    pub fn step_id(&self) -> &StepId {
        &self.step_definition.id
    }
}

/// Outcome of one handler invocation. The engine interprets this as:
/// `ok` completes the step, `fail` enters the retry/failure-policy path,
/// `wait` pauses the whole execution.
#[derive(Debug, Clone)]
pub enum StepResult {
    Ok { output: Value, cost: Option<Money>, token_usage: Option<TokenUsage> },
    Fail { error: String, error_code: ErrorCode },
    Wait { payload: Value },
}

impl StepResult {
    pub fn ok(output: Value) -> Self {
        StepResult::Ok { output, cost: None, token_usage: None }
    }

    pub fn ok_with_cost(output: Value, cost: Money) -> Self {
        StepResult::Ok { output, cost: Some(cost), token_usage: None }
    }

    pub fn ok_with_usage(output: Value, cost: Option<Money>, token_usage: TokenUsage) -> Self {
        StepResult::Ok { output, cost, token_usage: Some(token_usage) }
    }

    pub fn fail(error: impl Into<String>, error_code: ErrorCode) -> Self {
        StepResult::Fail { error: error.into(), error_code }
    }

    pub fn wait(payload: Value) -> Self {
        StepResult::Wait { payload }
    }
}

/// One implementation per `StepType`. Handlers accept only the
/// `StepConfig` variant matching their own `step_type`; callers that violate
/// this return `INVALID_CONFIG`.
#[async_trait]
pub trait StepHandler: Send + Sync {
    fn step_type(&self) -> StepType;
    async fn execute(&self, ctx: &StepContext, config: &pe_domain::StepConfig) -> StepResult;
}

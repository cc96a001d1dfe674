//! The `sub_process` step handler. Loads a child definition and
//! recursively invokes the engine, awaiting the child's terminal state.
//!
//! The handler crate cannot depend on `pe-engine` (the dependency runs the
//! other way: the engine wires up this handler). `ProcessRunner` is the seam
//! the engine implements so the handler can call back into it without a
//! circular crate dependency — a recursive engine invocation pattern
//! worth preserving.

use crate::context::{StepContext, StepHandler, StepResult};
use crate::expr::ExpressionEvaluator;
use async_trait::async_trait;
use pe_domain::{ErrorCode, ExecutionId, Money, StepConfig, StepId, StepType};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Terminal outcome of a child execution, as reported back to the handler.
#[derive(Debug, Clone)]
pub enum ChildOutcome {
    Completed {
        child_execution_id: ExecutionId,
        child_process_name: String,
        child_process_version: String,
        output_data: Value,
        duration_seconds: f64,
        cost: Money,
    },
    Failed {
        child_execution_id: ExecutionId,
        error_message: String,
    },
    WaitingApproval {
        child_execution_id: ExecutionId,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessRunnerError {
    #[error("process '{0}' not found or not published")]
    NotFound(String),
    #[error("child execution reached an unexpected state")]
    UnexpectedState,
    #[error("engine error starting child process: {0}")]
    Engine(String),
}

#[async_trait]
pub trait ProcessRunner: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    async fn start_child(
        &self,
        process_name: &str,
        version: Option<&str>,
        input: Value,
        parent_execution_id: ExecutionId,
        parent_step_id: StepId,
    ) -> Result<ChildOutcome, ProcessRunnerError>;
}

pub struct SubProcessHandler {
    runner: Arc<dyn ProcessRunner>,
    expr: ExpressionEvaluator,
}

impl SubProcessHandler {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self { runner, expr: ExpressionEvaluator::new() }
    }
}

#[async_trait]
impl StepHandler for SubProcessHandler {
    fn step_type(&self) -> StepType {
        StepType::SubProcess
    }

    async fn execute(&self, ctx: &StepContext, config: &StepConfig) -> StepResult {
        let StepConfig::SubProcess { process_name, version, input_mapping, output_key, .. } = config
        else {
            return StepResult::fail("sub_process handler received a non-sub_process config", ErrorCode::InvalidConfig);
        };

        let mapped_input = if input_mapping.is_empty() {
            ctx.input_data.clone()
        } else {
            let mut map = serde_json::Map::new();
            for (key, expression) in input_mapping {
                map.insert(key.clone(), self.expr.resolve_typed(expression, ctx));
            }
            Value::Object(map)
        };

        let outcome = self
            .runner
            .start_child(process_name, version.as_deref(), mapped_input, ctx.execution_id, ctx.step_id().clone())
            .await;

        match outcome {
            Ok(ChildOutcome::Completed {
                child_execution_id,
                child_process_name,
                child_process_version,
                output_data,
                duration_seconds,
                cost,
            }) => {
                let mut output = HashMap::new();
                output.insert(output_key.clone(), output_data);
                let mut json_output = serde_json::Map::new();
                for (k, v) in output {
                    json_output.insert(k, v);
                }
                json_output.insert("child_execution_id".into(), Value::String(child_execution_id.to_string()));
                json_output.insert("child_process_name".into(), Value::String(child_process_name));
                json_output.insert("child_process_version".into(), Value::String(child_process_version));
                json_output.insert("child_duration_seconds".into(), serde_json::json!(duration_seconds));
                json_output.insert("child_cost".into(), serde_json::json!(cost.as_decimal()));
                StepResult::ok_with_cost(Value::Object(json_output), cost)
            }
            Ok(ChildOutcome::Failed { error_message, .. }) => {
                StepResult::fail(format!("sub-process failed: {error_message}"), ErrorCode::SubProcessFailed)
            }
            Ok(ChildOutcome::WaitingApproval { child_execution_id }) => StepResult::wait(serde_json::json!({
                "child_execution_id": child_execution_id.to_string(),
                "waiting_reason": "child waiting for approval",
            })),
            Err(ProcessRunnerError::NotFound(name)) => {
                StepResult::fail(format!("process '{name}' not found or not published"), ErrorCode::ProcessNotFound)
            }
            Err(ProcessRunnerError::UnexpectedState) => {
                StepResult::fail("child execution reached an unexpected state", ErrorCode::UnexpectedState)
            }
            Err(ProcessRunnerError::Engine(e)) => StepResult::fail(e, ErrorCode::UnexpectedState),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pe_domain::{ExecutionId, Money, StepDefinition, StepId};
    use rust_decimal::Decimal;
    use std::sync::Mutex;

    struct ScriptedRunner {
        outcome: Mutex<Option<Result<ChildOutcome, ProcessRunnerError>>>,
        captured_input: Mutex<Option<Value>>,
    }

    #[async_trait]
    impl ProcessRunner for ScriptedRunner {
        async fn start_child(
            &self,
            _process_name: &str,
            _version: Option<&str>,
            input: Value,
            _parent_execution_id: ExecutionId,
            _parent_step_id: StepId,
        ) -> Result<ChildOutcome, ProcessRunnerError> {
            *self.captured_input.lock().unwrap() = Some(input);
            self.outcome.lock().unwrap().take().unwrap()
        }
    }

    fn ctx(config: StepConfig) -> StepContext {
        let step = StepDefinition {
            id: StepId::new("call"),
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
            process_name: "parent".into(),
            process_version: "1.0".into(),
            step_definition: step,
            step_outputs: {
                let mut m = HashMap::new();
                m.insert(StepId::new("research"), serde_json::json!("findings"));
                m
            },
            input_data: serde_json::json!({}),
        }
    }

    fn sub_process_config(mapping: HashMap<String, String>) -> StepConfig {
        StepConfig::SubProcess {
            process_name: "analysis".into(),
            version: None,
            input_mapping: mapping,
            output_key: "analysis".into(),
            wait_for_completion: true,
            timeout: std::time::Duration::from_secs(3600),
        }
    }

    #[tokio::test]
    async fn completed_child_maps_output_under_output_key() {
        let runner = Arc::new(ScriptedRunner {
            outcome: Mutex::new(Some(Ok(ChildOutcome::Completed {
                child_execution_id: ExecutionId::new(),
                child_process_name: "analysis".into(),
                child_process_version: "1.0".into(),
                output_data: serde_json::json!({"score": 9}),
                duration_seconds: 1.5,
                cost: Money::from_decimal(Decimal::new(100, 2)),
            }))),
            captured_input: Mutex::new(None),
        });
        let handler = SubProcessHandler::new(runner);
        let config = sub_process_config(HashMap::new());
        let c = ctx(config);
        let result = handler.execute(&c, &c.step_definition.config).await;
        match result {
            StepResult::Ok { output, cost, .. } => {
                assert_eq!(output["analysis"]["score"], 9);
                assert_eq!(cost.unwrap(), Money::from_decimal(Decimal::new(100, 2)));
            }
            other => panic!("expected ok, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_child_maps_to_sub_process_failed() {
        let runner = Arc::new(ScriptedRunner {
            outcome: Mutex::new(Some(Ok(ChildOutcome::Failed {
                child_execution_id: ExecutionId::new(),
                error_message: "boom".into(),
            }))),
            captured_input: Mutex::new(None),
        });
        let handler = SubProcessHandler::new(runner);
        let c = ctx(sub_process_config(HashMap::new()));
        let result = handler.execute(&c, &c.step_definition.config).await;
        assert!(matches!(result, StepResult::Fail { error_code: ErrorCode::SubProcessFailed, .. }));
    }

    #[tokio::test]
    async fn input_mapping_resolves_expressions() {
        let runner = Arc::new(ScriptedRunner {
            outcome: Mutex::new(Some(Ok(ChildOutcome::WaitingApproval { child_execution_id: ExecutionId::new() }))),
            captured_input: Mutex::new(None),
        });
        let mut mapping = HashMap::new();
        mapping.insert("data".to_string(), "{{steps.research.output}}".to_string());
        let runner_clone = runner.clone();
        let handler = SubProcessHandler::new(runner);
        let c = ctx(sub_process_config(mapping));
        let result = handler.execute(&c, &c.step_definition.config).await;
        assert!(matches!(result, StepResult::Wait { .. }));
        let captured = runner_clone.captured_input.lock().unwrap().clone().unwrap();
        assert_eq!(captured["data"], "findings");
    }

    #[tokio::test]
    async fn missing_process_maps_to_process_not_found() {
        let runner = Arc::new(ScriptedRunner {
            outcome: Mutex::new(Some(Err(ProcessRunnerError::NotFound("analysis".into())))),
            captured_input: Mutex::new(None),
        });
        let handler = SubProcessHandler::new(runner);
        let c = ctx(sub_process_config(HashMap::new()));
        let result = handler.execute(&c, &c.step_definition.config).await;
        assert!(matches!(result, StepResult::Fail { error_code: ErrorCode::ProcessNotFound, .. }));
    }
}

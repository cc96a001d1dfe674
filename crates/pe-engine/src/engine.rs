//! The `ExecutionEngine`: the DAG scheduler loop plus the `start` /
//! `cancel` / `resume` / `retry` contract. One instance is shared (behind
//! `Arc`, via `Clone`) across every execution; there is no per-process
//! singleton — callers assemble an `ExecutionEngine` once and hand
//! clones to whatever drives it (an HTTP handler, a scheduler task, a test).

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::{compensation, resolver};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use pe_domain::definition::{DefinitionStatus, ErrorAction, GatewayType, StepConfig, Version};
use pe_domain::{
    ApprovalId, ErrorCode, ExecutionId, ExecutionStatus, Money, ProcessDefinition, ProcessExecution,
    StepDefinition, StepExecution, StepId, StepStatus, StepType, TokenUsage, TriggeredBy,
};
use pe_events::{EventBus, ProcessEvent};
use pe_handlers::{
    informed_context, ChildOutcome, ConditionEvaluator, ExpressionEvaluator, HandlerRegistry,
    NoopNotifier, Notifier, ProcessRunner, ProcessRunnerError, StepContext, StepResult,
};
use pe_store::{ApprovalStore, DefinitionStore, ExecutionStore};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;

/// Shared state behind one logical engine. `ExecutionEngine` itself is a thin,
/// cheaply-`Clone`able handle to this (every field is already `Arc`-backed).
struct Inner {
    definitions: Arc<dyn DefinitionStore>,
    executions: Arc<dyn ExecutionStore>,
    approvals: Arc<dyn ApprovalStore>,
    handlers: HandlerRegistry,
    bus: Arc<EventBus>,
    notifier: Arc<dyn Notifier>,
    config: EngineConfig,
    condition: ConditionEvaluator,
    expr: ExpressionEvaluator,
    cancellations: DashMap<ExecutionId, CancellationToken>,
    cancel_reasons: DashMap<ExecutionId, String>,
    link_lock: Mutex<()>,
}

#[derive(Clone)]
pub struct ExecutionEngine {
    inner: Arc<Inner>,
}

impl ExecutionEngine {
    pub fn new(
        definitions: Arc<dyn DefinitionStore>,
        executions: Arc<dyn ExecutionStore>,
        approvals: Arc<dyn ApprovalStore>,
        handlers: HandlerRegistry,
        bus: Arc<EventBus>,
        config: EngineConfig,
    ) -> Self {
        Self::with_notifier(definitions, executions, approvals, handlers, bus, config, Arc::new(NoopNotifier))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_notifier(
        definitions: Arc<dyn DefinitionStore>,
        executions: Arc<dyn ExecutionStore>,
        approvals: Arc<dyn ApprovalStore>,
        handlers: HandlerRegistry,
        bus: Arc<EventBus>,
        config: EngineConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                definitions,
                executions,
                approvals,
                handlers,
                bus,
                notifier,
                config,
                condition: ConditionEvaluator::new(),
                expr: ExpressionEvaluator::new(),
                cancellations: DashMap::new(),
                cancel_reasons: DashMap::new(),
                link_lock: Mutex::new(()),
            }),
        }
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.inner.bus
    }

    pub fn approvals(&self) -> &Arc<dyn ApprovalStore> {
        &self.inner.approvals
    }

    pub fn executions(&self) -> &Arc<dyn ExecutionStore> {
        &self.inner.executions
    }

    /// Starts a new execution of `definition` and drives it to a terminal or
    /// paused state before returning. Callers that want a
    /// non-blocking kickoff `tokio::spawn` this themselves; `sub_process`
    /// recurses into it directly and awaits the child's conclusion.
    pub async fn start(
        &self,
        definition: ProcessDefinition,
        input: Value,
        triggered_by: TriggeredBy,
        parent_execution_id: Option<ExecutionId>,
        parent_step_id: Option<StepId>,
    ) -> EngineResult<ProcessExecution> {
        if definition.status != DefinitionStatus::Published {
            return Err(EngineError::StateForbidden(format!(
                "definition '{}' v{} is not published",
                definition.name, definition.version
            )));
        }

        let mut execution = ProcessExecution::new(
            definition.id,
            definition.name.clone(),
            definition.version.to_string(),
            input,
            triggered_by,
            parent_execution_id,
            parent_step_id,
        );
        for step in &definition.steps {
            execution
                .step_executions
                .insert(step.id.clone(), StepExecution::new(step.id.clone()));
        }
        execution.status = ExecutionStatus::Running;
        execution.started_at = Some(Utc::now());
        self.persist(&execution).await?;
        self.inner.bus.publish(
            execution.id,
            ProcessEvent::ProcessStarted {
                process_name: execution.process_name.clone(),
                process_version: execution.process_version.clone(),
            },
        );

        if let Some(parent_id) = parent_execution_id {
            self.link_child(parent_id, execution.id).await?;
        }

        self.run_to_conclusion(Arc::new(definition), execution).await
    }

    /// Looks up the definition by id and delegates to `start`: the
    /// convenience entry point the transport layer calls.
    pub async fn start_by_definition_id(
        &self,
        definition_id: pe_domain::DefinitionId,
        input: Value,
        triggered_by: TriggeredBy,
    ) -> EngineResult<ProcessExecution> {
        let definition = self.inner.definitions.get_by_id(definition_id).await?;
        self.start(definition, input, triggered_by, None, None).await
    }

    /// Signals cancellation. If the execution has no active
    /// loop driving it (it is `paused`), the transition happens immediately;
    /// otherwise the running loop notices the signal at its next suspension
    /// point and finalizes it. Idempotent once terminal.
    pub async fn cancel(&self, execution_id: ExecutionId, reason: impl Into<String>) -> EngineResult<ProcessExecution> {
        let mut execution = self.inner.executions.get_by_id(execution_id).await?;
        if execution.status.is_terminal() {
            return Ok(execution);
        }

        let reason = reason.into();
        self.inner.cancel_reasons.insert(execution_id, reason.clone());
        if let Some(token) = self.inner.cancellations.get(&execution_id) {
            token.cancel();
        }

        if execution.status == ExecutionStatus::Paused {
            execution.status = ExecutionStatus::Cancelled;
            execution.completed_at = Some(Utc::now());
            self.persist(&execution).await?;
            self.inner.bus.publish(execution_id, ProcessEvent::ProcessCancelled { reason });
        }
        Ok(execution)
    }

    /// Resumes a paused execution: used after an approval
    /// decision, or any other `wait` outcome clearing.
    pub async fn resume(&self, execution_id: ExecutionId) -> EngineResult<ProcessExecution> {
        let mut execution = self.inner.executions.get_by_id(execution_id).await?;
        if execution.status != ExecutionStatus::Paused {
            return Err(EngineError::StateForbidden(format!(
                "execution {execution_id} is not paused"
            )));
        }
        let definition = self.inner.definitions.get_by_id(execution.process_id).await?;
        execution.status = ExecutionStatus::Running;
        for se in execution.step_executions.values_mut() {
            if se.status == StepStatus::WaitingApproval {
                se.status = StepStatus::Ready;
            }
        }
        self.persist(&execution).await?;
        self.run_to_conclusion(Arc::new(definition), execution).await
    }

    /// Starts a fresh execution from a failed one's input,
    /// linked back via `retry_of`.
    pub async fn retry(&self, execution_id: ExecutionId) -> EngineResult<ProcessExecution> {
        let original = self.inner.executions.get_by_id(execution_id).await?;
        if original.status != ExecutionStatus::Failed {
            return Err(EngineError::StateForbidden(format!(
                "execution {execution_id} is not failed"
            )));
        }
        let definition = self.inner.definitions.get_by_id(original.process_id).await?;

        let mut execution = ProcessExecution::new(
            definition.id,
            definition.name.clone(),
            definition.version.to_string(),
            original.input_data.clone(),
            TriggeredBy::Retry,
            original.parent_execution_id,
            original.parent_step_id.clone(),
        );
        execution.retry_of = Some(original.id);
        for step in &definition.steps {
            execution
                .step_executions
                .insert(step.id.clone(), StepExecution::new(step.id.clone()));
        }
        execution.status = ExecutionStatus::Running;
        execution.started_at = Some(Utc::now());
        self.persist(&execution).await?;
        self.inner.bus.publish(
            execution.id,
            ProcessEvent::ProcessStarted {
                process_name: execution.process_name.clone(),
                process_version: execution.process_version.clone(),
            },
        );
        if let Some(parent_id) = execution.parent_execution_id {
            self.link_child(parent_id, execution.id).await?;
        }

        self.run_to_conclusion(Arc::new(definition), execution).await
    }

    async fn persist(&self, execution: &ProcessExecution) -> EngineResult<()> {
        self.inner.executions.save(execution.clone()).await?;
        Ok(())
    }

    async fn link_child(&self, parent_id: ExecutionId, child_id: ExecutionId) -> EngineResult<()> {
        let _guard = self.inner.link_lock.lock().await;
        let mut parent = self.inner.executions.get_by_id(parent_id).await?;
        if !parent.child_execution_ids.contains(&child_id) {
            parent.child_execution_ids.push(child_id);
            self.persist(&parent).await?;
        }
        Ok(())
    }

    /// The top-level scheduler loop: resolve ready steps, dispatch
    /// them (sequentially or concurrently per `EngineConfig`), and repeat
    /// until the execution completes, fails, pauses, or is cancelled.
    async fn run_to_conclusion(
        &self,
        definition: Arc<ProcessDefinition>,
        execution: ProcessExecution,
    ) -> EngineResult<ProcessExecution> {
        let exec_id = execution.id;
        let cancel = CancellationToken::new();
        self.inner.cancellations.insert(exec_id, cancel.clone());
        let state = Arc::new(Mutex::new(execution));

        loop {
            if cancel.is_cancelled() {
                let mut ex = state.lock().await;
                if !ex.status.is_terminal() {
                    ex.status = ExecutionStatus::Cancelled;
                    ex.completed_at = Some(Utc::now());
                    self.persist(&ex).await?;
                    let reason = self
                        .inner
                        .cancel_reasons
                        .remove(&exec_id)
                        .map(|(_, v)| v)
                        .unwrap_or_else(|| "cancelled".to_string());
                    self.inner.bus.publish(exec_id, ProcessEvent::ProcessCancelled { reason });
                }
                break;
            }

            let snapshot = state.lock().await.clone();

            if snapshot.failed_step_id.is_some() && self.inner.config.stop_on_failure {
                let mut ex = state.lock().await;
                let failed_step_id = ex.failed_step_id.clone();
                self.fail_execution(&definition, &mut ex, "one or more steps failed".into(), failed_step_id)
                    .await?;
                break;
            }

            let ready = resolver::get_ready_steps(&definition, &snapshot);

            if ready.is_empty() {
                if resolver::is_complete(&snapshot) {
                    let mut ex = state.lock().await;
                    self.complete_execution(&definition, &mut ex).await?;
                    break;
                }
                if !resolver::get_running_steps(&snapshot).is_empty() {
                    tokio::select! {
                        _ = tokio::time::sleep(self.inner.config.poll_interval) => {}
                        _ = cancel.cancelled() => {}
                    }
                    continue;
                }
                if !resolver::get_waiting_steps(&snapshot).is_empty() {
                    let mut ex = state.lock().await;
                    ex.status = ExecutionStatus::Paused;
                    self.persist(&ex).await?;
                    break;
                }
                let mut ex = state.lock().await;
                self.fail_execution(
                    &definition,
                    &mut ex,
                    "deadlock: no step is ready, running, or waiting for approval".into(),
                    None,
                )
                .await?;
                break;
            }

            if self.inner.config.parallel_execution && ready.len() > 1 {
                let permits = if self.inner.config.max_concurrent_steps == 0 {
                    None
                } else {
                    Some(Arc::new(Semaphore::new(self.inner.config.max_concurrent_steps)))
                };
                let mut joins = Vec::with_capacity(ready.len());
                for step_id in ready {
                    let step = definition
                        .step(&step_id)
                        .expect("a ready step id always resolves in its own definition")
                        .clone();
                    let state = state.clone();
                    let cancel = cancel.clone();
                    let engine = self.clone();
                    let def = definition.clone();
                    let permits = permits.clone();
                    joins.push(tokio::spawn(async move {
                        let _permit = match &permits {
                            Some(sem) => Some(sem.clone().acquire_owned().await.expect("semaphore is never closed")),
                            None => None,
                        };
                        engine.dispatch_step(&def, &step, &state, &cancel).await;
                    }));
                }
                for join in joins {
                    let _ = join.await;
                }
            } else {
                for step_id in ready {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let step = definition
                        .step(&step_id)
                        .expect("a ready step id always resolves in its own definition")
                        .clone();
                    self.dispatch_step(&definition, &step, &state, &cancel).await;
                }
            }
        }

        self.inner.cancellations.remove(&exec_id);
        let final_state = state.lock().await.clone();
        Ok(final_state)
    }

    fn build_context(&self, step: &StepDefinition, execution: &ProcessExecution) -> StepContext {
        let step_outputs = execution
            .step_executions
            .values()
            .filter_map(|se| se.output.clone().map(|o| (se.step_id.clone(), o)))
            .collect();
        StepContext {
            execution_id: execution.id,
            process_name: execution.process_name.clone(),
            process_version: execution.process_version.clone(),
            step_definition: step.clone(),
            step_outputs,
            input_data: execution.input_data.clone(),
        }
    }

    /// Dispatches one ready step to its handler, including the retry/backoff
    /// loop and error-policy handling on exhausted failure
    ///. Cooperates with cancellation at every suspension point.
    async fn dispatch_step(
        &self,
        definition: &ProcessDefinition,
        step: &StepDefinition,
        state: &Arc<Mutex<ProcessExecution>>,
        cancel: &CancellationToken,
    ) {
        let exec_id = state.lock().await.id;

        if let Some(cond) = &step.condition {
            let ctx = { let ex = state.lock().await; self.build_context(step, &ex) };
            if !self.inner.condition.evaluate(cond, &ctx) {
                let mut ex = state.lock().await;
                if let Some(se) = ex.step_mut(&step.id) {
                    se.status = StepStatus::Skipped;
                    se.completed_at = Some(Utc::now());
                    se.error = Some("condition not met".into());
                }
                let _ = self.persist(&ex).await;
                drop(ex);
                self.inner
                    .bus
                    .publish(exec_id, ProcessEvent::StepSkipped { step_id: step.id.clone(), reason: "condition not met".into() });
                return;
            }
        }

        {
            let mut ex = state.lock().await;
            if let Some(se) = ex.step_mut(&step.id) {
                se.status = StepStatus::Running;
                se.started_at = Some(Utc::now());
            }
            let _ = self.persist(&ex).await;
        }
        self.inner.bus.publish(exec_id, ProcessEvent::StepStarted { step_id: step.id.clone() });

        let Some(handler) = self.inner.handlers.get(step.step_type()) else {
            self.finalize_step_failure(
                state,
                step,
                format!("no handler registered for step type '{}'", step.step_type()),
                ErrorCode::InvalidConfig,
                1,
            )
            .await;
            return;
        };

        let max_attempts = step.retry_policy.max_attempts.max(1);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            if cancel.is_cancelled() {
                return;
            }
            let ctx = { let ex = state.lock().await; self.build_context(step, &ex) };
            let timeout = step.timeout.unwrap_or(self.inner.config.default_step_timeout);

            let result = tokio::select! {
                r = handler.execute(&ctx, &step.config) => r,
                _ = tokio::time::sleep(timeout) => StepResult::fail("step timed out", ErrorCode::Timeout),
                _ = cancel.cancelled() => return,
            };

            match result {
                StepResult::Ok { output, cost, token_usage } => {
                    self.finalize_step_success(definition, state, step, output, cost, token_usage, attempt).await;
                    return;
                }
                StepResult::Wait { payload } => {
                    self.finalize_step_wait(state, step, payload, attempt).await;
                    return;
                }
                StepResult::Fail { error, error_code } => {
                    if !error_code.is_retryable() || attempt >= max_attempts {
                        self.finalize_step_failure(state, step, error, error_code, attempt).await;
                        return;
                    }
                    let delay = step.retry_policy.delay_for_attempt(attempt);
                    self.inner.bus.publish(
                        exec_id,
                        ProcessEvent::StepRetrying { step_id: step.id.clone(), attempt, next_delay: delay },
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = cancel.cancelled() => return,
                    }
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn finalize_step_success(
        &self,
        definition: &ProcessDefinition,
        state: &Arc<Mutex<ProcessExecution>>,
        step: &StepDefinition,
        output: Value,
        cost: Option<Money>,
        token_usage: Option<TokenUsage>,
        attempt: u32,
    ) {
        let exec_id;
        {
            let mut ex = state.lock().await;
            exec_id = ex.id;
            if let Some(c) = cost {
                ex.total_cost += c;
            }
            if let Some(se) = ex.step_mut(&step.id) {
                se.status = StepStatus::Completed;
                se.completed_at = Some(Utc::now());
                se.output = Some(output.clone());
                se.attempts = attempt;
                if let Some(c) = cost {
                    se.cost = c;
                }
                se.token_usage = token_usage;
            }
            let _ = self.persist(&ex).await;
        }
        self.inner
            .bus
            .publish(exec_id, ProcessEvent::StepCompleted { step_id: step.id.clone(), output: output.clone() });

        if let Some(roles) = &step.roles {
            if !roles.informed.is_empty() {
                let ctx_value = informed_context(&step.id, &output);
                self.inner.notifier.notify(step, "completed", &ctx_value).await;
                self.inner.bus.publish(
                    exec_id,
                    ProcessEvent::InformedNotification {
                        step_id: step.id.clone(),
                        message: format!("step '{}' completed", step.id),
                    },
                );
            }
        }

        if let Some(threshold) = self.inner.config.cost_alert_threshold {
            let total = state.lock().await.total_cost;
            if total.as_decimal() >= threshold.as_decimal() {
                self.inner.bus.publish(
                    exec_id,
                    ProcessEvent::InformedNotification {
                        step_id: step.id.clone(),
                        message: format!(
                            "execution cost {} crossed alert threshold {}",
                            total.as_decimal(),
                            threshold.as_decimal()
                        ),
                    },
                );
            }
        }

        if step.step_type() == StepType::Gateway {
            let mut ex = state.lock().await;
            self.apply_gateway_routing(definition, &mut ex, step, &output);
            let _ = self.persist(&ex).await;
        }
    }

    async fn finalize_step_wait(&self, state: &Arc<Mutex<ProcessExecution>>, step: &StepDefinition, payload: Value, attempt: u32) {
        let exec_id;
        let approval_id = payload
            .get("approval_id")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<uuid::Uuid>().ok())
            .map(ApprovalId::from);
        {
            let mut ex = state.lock().await;
            exec_id = ex.id;
            if let Some(se) = ex.step_mut(&step.id) {
                se.status = StepStatus::WaitingApproval;
                se.attempts = attempt;
                se.output = Some(payload);
            }
            let _ = self.persist(&ex).await;
        }
        self.inner
            .bus
            .publish(exec_id, ProcessEvent::StepWaitingApproval { step_id: step.id.clone(), approval_id });
        if let (StepType::HumanApproval, Some(approval_id)) = (step.step_type(), approval_id) {
            self.inner
                .bus
                .publish(exec_id, ProcessEvent::ApprovalRequested { approval_id, step_id: step.id.clone() });
        }
    }

    async fn finalize_step_failure(
        &self,
        state: &Arc<Mutex<ProcessExecution>>,
        step: &StepDefinition,
        error: String,
        error_code: ErrorCode,
        attempt: u32,
    ) {
        let exec_id;
        {
            let mut ex = state.lock().await;
            exec_id = ex.id;
            let action = step.error_policy.action.clone();
            if let Some(se) = ex.step_mut(&step.id) {
                se.error = Some(error.clone());
                se.error_code = Some(error_code);
                se.attempts = attempt;
                se.completed_at = Some(Utc::now());
                se.status = match action {
                    ErrorAction::FailProcess | ErrorAction::GotoStep { .. } => StepStatus::Failed,
                    ErrorAction::SkipStep => StepStatus::Skipped,
                };
            }
            if let ErrorAction::GotoStep { target_step } = &action {
                if let Some(target) = ex.step_mut(target_step) {
                    target.status = StepStatus::Ready;
                }
            }
            if ex.failed_step_id.is_none() && matches!(action, ErrorAction::FailProcess) {
                ex.failed_step_id = Some(step.id.clone());
            }
            let _ = self.persist(&ex).await;
        }
        self.inner.bus.publish(
            exec_id,
            ProcessEvent::StepFailed { step_id: step.id.clone(), error: error.clone(), error_code },
        );
        if matches!(step.error_policy.action, ErrorAction::SkipStep) {
            self.inner
                .bus
                .publish(exec_id, ProcessEvent::StepSkipped { step_id: step.id.clone(), reason: error });
        }
    }

    /// Realizes a gateway's routing decision: for an `exclusive`
    /// gateway, direct dependents on the road not taken are skipped rather
    /// than dispatched. `parallel` gateways let every configured route
    /// proceed, so nothing is skipped.
    fn apply_gateway_routing(
        &self,
        definition: &ProcessDefinition,
        execution: &mut ProcessExecution,
        gateway_step: &StepDefinition,
        output: &Value,
    ) {
        let StepConfig::Gateway { gateway_type, routes, .. } = &gateway_step.config else {
            return;
        };
        if *gateway_type != GatewayType::Exclusive {
            return;
        }
        let Some(target) = output.get("target_step").and_then(Value::as_str) else {
            return;
        };
        let target = StepId::new(target);
        let route_targets: HashSet<&StepId> = routes.iter().map(|r| &r.target).collect();

        for step in &definition.steps {
            if step.id == target || !route_targets.contains(&step.id) {
                continue;
            }
            if !step.dependencies.contains(&gateway_step.id) {
                continue;
            }
            if let Some(se) = execution.step_mut(&step.id) {
                if se.status == StepStatus::Pending {
                    se.status = StepStatus::Skipped;
                    se.completed_at = Some(Utc::now());
                    se.error = Some("gateway routed to a different branch".into());
                }
            }
        }
    }

    async fn complete_execution(&self, definition: &ProcessDefinition, execution: &mut ProcessExecution) -> EngineResult<()> {
        let step_outputs = execution
            .step_executions
            .values()
            .filter_map(|se| se.output.clone().map(|o| (se.step_id.clone(), o)))
            .collect();
        let placeholder = StepDefinition {
            id: StepId::new("__outputs__"),
            name: None,
            config: StepConfig::Timer { duration: None, until: None },
            dependencies: Default::default(),
            condition: None,
            retry_policy: Default::default(),
            error_policy: Default::default(),
            compensation: None,
            roles: None,
            timeout: None,
        };
        let ctx = StepContext {
            execution_id: execution.id,
            process_name: execution.process_name.clone(),
            process_version: execution.process_version.clone(),
            step_definition: placeholder,
            step_outputs,
            input_data: execution.input_data.clone(),
        };

        let mut output = serde_json::Map::new();
        for out in &definition.outputs {
            output.insert(out.name.clone(), self.inner.expr.resolve_typed(&out.source, &ctx));
        }

        execution.output_data = Some(Value::Object(output.clone()));
        execution.status = ExecutionStatus::Completed;
        execution.completed_at = Some(Utc::now());
        self.persist(execution).await?;
        self.inner.bus.publish(execution.id, ProcessEvent::ProcessCompleted { output: Value::Object(output) });
        Ok(())
    }

    async fn fail_execution(
        &self,
        definition: &ProcessDefinition,
        execution: &mut ProcessExecution,
        error: String,
        failed_step_id: Option<StepId>,
    ) -> EngineResult<()> {
        self.run_compensations(definition, execution).await;
        execution.status = ExecutionStatus::Failed;
        execution.completed_at = Some(Utc::now());
        execution.error_message = Some(error.clone());
        execution.failed_step_id = failed_step_id.clone();
        self.persist(execution).await?;
        self.inner
            .bus
            .publish(execution.id, ProcessEvent::ProcessFailed { error, failed_step_id });
        Ok(())
    }

    /// Runs every completed step's compensation in reverse completion order
    ///. Only reached on `fail_execution`, never on `cancel`.
    async fn run_compensations(&self, definition: &ProcessDefinition, execution: &mut ProcessExecution) {
        let steps = compensation::steps_to_compensate(definition, execution);
        if steps.is_empty() {
            return;
        }
        self.inner
            .bus
            .publish(execution.id, ProcessEvent::CompensationStarted { count: steps.len() });

        for step in steps {
            let comp = step.compensation.as_ref().expect("steps_to_compensate only returns steps with a compensation");
            let Some(handler) = self.inner.handlers.get(comp.config.step_type()) else {
                self.inner.bus.publish(
                    execution.id,
                    ProcessEvent::CompensationFailed {
                        step_id: step.id.clone(),
                        error: format!("no handler registered for compensation type '{}'", comp.config.step_type()),
                    },
                );
                continue;
            };
            let original_output = execution.step(&step.id).and_then(|se| se.output.clone()).unwrap_or(Value::Null);
            let mut step_outputs: std::collections::HashMap<StepId, Value> = execution
                .step_executions
                .values()
                .filter_map(|se| se.output.clone().map(|o| (se.step_id.clone(), o)))
                .collect();
            step_outputs.insert(step.id.clone(), original_output);

            let ctx = StepContext {
                execution_id: execution.id,
                process_name: execution.process_name.clone(),
                process_version: execution.process_version.clone(),
                step_definition: StepDefinition { config: comp.config.clone(), ..step.clone() },
                step_outputs,
                input_data: execution.input_data.clone(),
            };

            match handler.execute(&ctx, &comp.config).await {
                StepResult::Ok { .. } => {
                    self.inner
                        .bus
                        .publish(execution.id, ProcessEvent::CompensationCompleted { step_id: step.id.clone() });
                }
                StepResult::Fail { error, .. } => {
                    self.inner
                        .bus
                        .publish(execution.id, ProcessEvent::CompensationFailed { step_id: step.id.clone(), error });
                }
                StepResult::Wait { .. } => {
                    self.inner.bus.publish(
                        execution.id,
                        ProcessEvent::CompensationFailed {
                            step_id: step.id.clone(),
                            error: "compensation handler returned wait, which is unsupported".into(),
                        },
                    );
                }
            }
        }
    }
}

fn parse_version(s: &str) -> Result<Version, String> {
    let mut parts = s.split('.');
    let major = parts.next().and_then(|p| p.parse().ok()).ok_or_else(|| format!("invalid version '{s}'"))?;
    let minor = parts.next().and_then(|p| p.parse().ok()).ok_or_else(|| format!("invalid version '{s}'"))?;
    Ok(Version::new(major, minor))
}

/// The engine implements `ProcessRunner` itself so `SubProcessHandler` can
/// recurse into it without `pe-handlers` depending on `pe-engine`.
#[async_trait]
impl ProcessRunner for ExecutionEngine {
    async fn start_child(
        &self,
        process_name: &str,
        version: Option<&str>,
        input: Value,
        parent_execution_id: ExecutionId,
        parent_step_id: StepId,
    ) -> Result<ChildOutcome, ProcessRunnerError> {
        let version = version.map(parse_version).transpose().map_err(ProcessRunnerError::Engine)?;
        let definition = self
            .inner
            .definitions
            .get_by_name(process_name, version)
            .await
            .map_err(|_| ProcessRunnerError::NotFound(process_name.to_string()))?;
        if definition.status != DefinitionStatus::Published {
            return Err(ProcessRunnerError::NotFound(process_name.to_string()));
        }

        let started_at = Utc::now();
        let execution = self
            .start(definition, input, TriggeredBy::SubProcess, Some(parent_execution_id), Some(parent_step_id))
            .await
            .map_err(|e| ProcessRunnerError::Engine(e.to_string()))?;

        match execution.status {
            ExecutionStatus::Completed => {
                let duration_seconds = execution
                    .completed_at
                    .map(|c| (c - started_at).num_milliseconds() as f64 / 1000.0)
                    .unwrap_or(0.0);
                Ok(ChildOutcome::Completed {
                    child_execution_id: execution.id,
                    child_process_name: execution.process_name,
                    child_process_version: execution.process_version,
                    output_data: execution.output_data.unwrap_or(Value::Null),
                    duration_seconds,
                    cost: execution.total_cost,
                })
            }
            ExecutionStatus::Failed => Ok(ChildOutcome::Failed {
                child_execution_id: execution.id,
                error_message: execution.error_message.unwrap_or_default(),
            }),
            ExecutionStatus::Paused => Ok(ChildOutcome::WaitingApproval { child_execution_id: execution.id }),
            _ => Err(ProcessRunnerError::UnexpectedState),
        }
    }
}

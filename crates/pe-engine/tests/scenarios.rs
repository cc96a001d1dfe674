//! End-to-end scenarios driving the full engine (real handlers, in-memory
//! stores, a scripted `AgentGateway`) the way a single unit test can't:
//! linear success, parallel fan-out/in, retry-then-succeed, an approval
//! rejection, a sub-process happy path, and compensation on failure.

use async_trait::async_trait;
use pe_domain::{ExecutionStatus, StepStatus, TriggeredBy};
use pe_engine::{EngineConfig, ExecutionEngine};
use pe_events::{EventBus, EventHandler, EventEnvelope, EventType};
use pe_handlers::{
    AgentGateway, AgentGatewayError, AgentResponse, AgentTaskHandler, GatewayHandler,
    HandlerRegistry, HumanApprovalHandler, SubProcessHandler, TimerHandler,
};
use pe_store::{
    ApprovalStore, DefinitionStore, ExecutionStore, InMemoryApprovalStore, InMemoryDefinitionStore,
    InMemoryExecutionStore,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// An `AgentGateway` that always succeeds, echoing the message back, except
/// for a configurable number of leading calls per agent which fail with a
/// retryable error — used to drive the retry-then-succeed scenario.
struct ScriptedGateway {
    fail_first_n: AtomicUsize,
}

impl ScriptedGateway {
    fn always_succeeds() -> Self {
        Self { fail_first_n: AtomicUsize::new(0) }
    }

    fn fails_first(n: usize) -> Self {
        Self { fail_first_n: AtomicUsize::new(n) }
    }
}

#[async_trait]
impl AgentGateway for ScriptedGateway {
    async fn is_available(&self, _agent: &str) -> bool {
        true
    }

    async fn send_message(
        &self,
        agent: &str,
        message: &str,
        _model: Option<&str>,
        _temperature: Option<f64>,
    ) -> Result<AgentResponse, AgentGatewayError> {
        let remaining = self.fail_first_n.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_first_n.store(remaining - 1, Ordering::SeqCst);
            return Err(AgentGatewayError::CallFailed("scripted transient failure".into()));
        }
        Ok(AgentResponse {
            response: json!({ "echo": message, "agent": agent }),
            cost: Some(pe_domain::Money::from_decimal(rust_decimal::Decimal::new(100, 2))),
            token_usage: None,
        })
    }
}

/// A `timer`-backed stand-in for a step that "sleeps" without actually
/// waiting, so the parallel-overlap scenario runs in real (short) time but
/// the overlap assertion is about wall-clock order, not duration.
fn registry_with(gateway: Arc<dyn AgentGateway>) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry
        .register(Arc::new(AgentTaskHandler::new(gateway)))
        .register(Arc::new(GatewayHandler::new()))
        .register(Arc::new(TimerHandler::new(CancellationToken::new())));
    registry
}

struct RecordingHandler(Arc<Mutex<Vec<EventType>>>);

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn handle(&self, event: EventEnvelope) -> anyhow::Result<()> {
        self.0.lock().unwrap().push(event.event_type());
        Ok(())
    }
}

fn recording_bus() -> (Arc<EventBus>, Arc<Mutex<Vec<EventType>>>) {
    let bus = Arc::new(EventBus::new());
    let log = Arc::new(Mutex::new(Vec::new()));
    bus.subscribe_all(Arc::new(RecordingHandler(log.clone())));
    (bus, log)
}

fn engine(registry: HandlerRegistry, bus: Arc<EventBus>, config: EngineConfig) -> (ExecutionEngine, Arc<dyn ExecutionStore>) {
    let definitions: Arc<dyn DefinitionStore> = Arc::new(InMemoryDefinitionStore::new());
    let executions: Arc<dyn ExecutionStore> = Arc::new(InMemoryExecutionStore::new());
    let approvals: Arc<dyn ApprovalStore> = Arc::new(InMemoryApprovalStore::new());
    let engine = ExecutionEngine::new(definitions, executions.clone(), approvals, registry, bus, config);
    (engine, executions)
}

#[tokio::test]
async fn linear_three_step_success_emits_events_in_order() {
    let raw = r#"
name: linear-flow
steps:
  - id: a
    type: agent_task
    agent: analyst
    message: "step a"
  - id: b
    type: agent_task
    agent: analyst
    message: "step b"
    dependencies: [a]
  - id: c
    type: agent_task
    agent: analyst
    message: "step c"
    dependencies: [b]
"#;
    let mut definition = pe_validator::validate(raw, "alice").definition.unwrap();
    definition.publish().unwrap();

    let (bus, log) = recording_bus();
    let registry = registry_with(Arc::new(ScriptedGateway::always_succeeds()));
    let (engine, _executions) = engine(registry, bus, EngineConfig { parallel_execution: false, ..EngineConfig::default() });

    let execution = engine.start(definition, json!({}), TriggeredBy::Manual, None, None).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Completed);

    tokio::time::sleep(Duration::from_millis(20)).await;
    let events = log.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            EventType::ProcessStarted,
            EventType::StepStarted,
            EventType::StepCompleted,
            EventType::StepStarted,
            EventType::StepCompleted,
            EventType::StepStarted,
            EventType::StepCompleted,
            EventType::ProcessCompleted,
        ]
    );
}

#[tokio::test]
async fn parallel_fan_out_overlaps_and_joins() {
    let raw = r#"
name: fan-out-flow
steps:
  - id: a
    type: timer
    duration: 10ms
  - id: b
    type: timer
    duration: 150ms
    dependencies: [a]
  - id: c
    type: timer
    duration: 150ms
    dependencies: [a]
  - id: d
    type: timer
    duration: 10ms
    dependencies: [b, c]
"#;
    let mut definition = pe_validator::validate(raw, "alice").definition.unwrap();
    definition.publish().unwrap();

    let (bus, _log) = recording_bus();
    let registry = registry_with(Arc::new(ScriptedGateway::always_succeeds()));
    let (engine, _executions) = engine(registry, bus, EngineConfig { parallel_execution: true, ..EngineConfig::default() });

    let started = std::time::Instant::now();
    let execution = engine.start(definition, json!({}), TriggeredBy::Manual, None, None).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(execution.status, ExecutionStatus::Completed);
    // b and c run concurrently (150ms each); sequential would take >300ms.
    assert!(elapsed < Duration::from_millis(300), "expected overlap, took {elapsed:?}");

    let b = execution.step(&pe_domain::StepId::new("b")).unwrap();
    let c = execution.step(&pe_domain::StepId::new("c")).unwrap();
    let overlap = b.started_at.unwrap().max(c.started_at.unwrap()) < b.completed_at.unwrap().min(c.completed_at.unwrap());
    assert!(overlap, "b and c should have overlapping intervals");

    let d = execution.step(&pe_domain::StepId::new("d")).unwrap();
    assert!(d.started_at.unwrap() >= b.completed_at.unwrap());
    assert!(d.started_at.unwrap() >= c.completed_at.unwrap());
}

#[tokio::test]
async fn retry_then_succeed_emits_two_retrying_events() {
    let raw = r#"
name: retry-flow
steps:
  - id: a
    type: agent_task
    agent: analyst
    message: "hi"
    retry:
      max_attempts: 3
      initial_delay: 1ms
      backoff_multiplier: 2
"#;
    let mut definition = pe_validator::validate(raw, "alice").definition.unwrap();
    definition.publish().unwrap();

    let (bus, log) = recording_bus();
    let registry = registry_with(Arc::new(ScriptedGateway::fails_first(2)));
    let (engine, _executions) = engine(registry, bus, EngineConfig::default());

    let execution = engine.start(definition, json!({}), TriggeredBy::Manual, None, None).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(execution.step(&pe_domain::StepId::new("a")).unwrap().attempts, 3);

    tokio::time::sleep(Duration::from_millis(20)).await;
    let retrying = log.lock().unwrap().iter().filter(|e| **e == EventType::StepRetrying).count();
    assert_eq!(retrying, 2);
}

#[tokio::test]
async fn human_approval_reject_fails_execution_before_next_step() {
    let raw = r#"
name: approval-flow
steps:
  - id: a
    type: agent_task
    agent: analyst
    message: "hi"
  - id: gate
    type: human_approval
    timeout: 1h
    dependencies: [a]
  - id: b
    type: agent_task
    agent: analyst
    message: "should never run"
    dependencies: [gate]
"#;
    let mut definition = pe_validator::validate(raw, "alice").definition.unwrap();
    definition.publish().unwrap();

    let (bus, _log) = recording_bus();
    let approvals: Arc<dyn ApprovalStore> = Arc::new(InMemoryApprovalStore::new());
    let definitions: Arc<dyn DefinitionStore> = Arc::new(InMemoryDefinitionStore::new());
    let executions: Arc<dyn ExecutionStore> = Arc::new(InMemoryExecutionStore::new());

    let mut registry = registry_with(Arc::new(ScriptedGateway::always_succeeds()));
    registry.register(Arc::new(HumanApprovalHandler::new(approvals.clone())));

    let engine = ExecutionEngine::new(definitions, executions, approvals.clone(), registry, bus, EngineConfig::default());

    let execution = engine.start(definition.clone(), json!({}), TriggeredBy::Manual, None, None).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Paused);

    let pending = approvals.list_pending_for(None).await.unwrap();
    assert_eq!(pending.len(), 1);
    let mut approval = pending[0].clone();
    approval.reject("alice", Some("no".into()));
    approvals.save(approval).await.unwrap();

    let resumed = engine.resume(execution.id).await.unwrap();
    assert_eq!(resumed.status, ExecutionStatus::Failed);
    assert_eq!(
        resumed.step(&pe_domain::StepId::new("gate")).unwrap().error_code,
        Some(pe_domain::ErrorCode::ApprovalRejected)
    );
    assert_eq!(resumed.step(&pe_domain::StepId::new("b")).unwrap().status, StepStatus::Pending);
}

#[tokio::test]
async fn sub_process_happy_path_aggregates_cost_and_links_ids() {
    let child_raw = r#"
name: analysis
steps:
  - id: research
    type: agent_task
    agent: analyst
    message: "look into {{input.data}}"
outputs:
  - name: research
    source: "{{steps.research.output}}"
"#;
    let parent_raw = r#"
name: orchestrator
steps:
  - id: call
    type: sub_process
    process_name: analysis
    input_mapping:
      data: "{{input.topic}}"
    output_key: analysis
"#;

    let mut child = pe_validator::validate(child_raw, "alice").definition.unwrap();
    child.publish().unwrap();
    let mut parent = pe_validator::validate(parent_raw, "alice").definition.unwrap();
    parent.publish().unwrap();

    let (bus, _log) = recording_bus();
    let definitions: Arc<dyn DefinitionStore> = Arc::new(InMemoryDefinitionStore::new());
    definitions.save(child.clone()).await.unwrap();
    let executions: Arc<dyn ExecutionStore> = Arc::new(InMemoryExecutionStore::new());
    let approvals: Arc<dyn ApprovalStore> = Arc::new(InMemoryApprovalStore::new());

    let runner = Arc::new(pe_server_test_support::StubRunnerSlot::new());
    let mut registry = registry_with(Arc::new(ScriptedGateway::always_succeeds()));
    registry.register(Arc::new(SubProcessHandler::new(runner.clone())));

    let engine = ExecutionEngine::new(
        definitions,
        executions.clone(),
        approvals,
        registry,
        bus,
        EngineConfig::default(),
    );
    runner.set(engine.clone());

    let execution = engine
        .start(parent, json!({"topic": "widgets"}), TriggeredBy::Manual, None, None)
        .await
        .unwrap();

    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(execution.child_execution_ids.len(), 1);
    let child_id = execution.child_execution_ids[0];
    let child_execution = executions.get_by_id(child_id).await.unwrap();
    assert_eq!(child_execution.parent_execution_id, Some(execution.id));
    assert!(execution.total_cost.as_decimal() >= child_execution.total_cost.as_decimal());

    let call_output = execution.step(&pe_domain::StepId::new("call")).unwrap().output.clone().unwrap();
    assert_eq!(call_output["analysis"]["research"]["response"]["echo"], json!("look into widgets"));
}

#[tokio::test]
async fn compensation_runs_on_failure_in_reverse_completion_order() {
    let raw = r#"
name: compensated-flow
steps:
  - id: a
    type: agent_task
    agent: analyst
    message: "do a"
    compensation:
      type: agent_task
      agent: analyst
      message: "undo a"
  - id: b
    type: agent_task
    agent: broken-agent
    message: "do b"
    dependencies: [a]
"#;
    let mut definition = pe_validator::validate(raw, "alice").definition.unwrap();
    definition.publish().unwrap();

    let (bus, log) = recording_bus();
    let registry = registry_with(Arc::new(UnavailableForAgent("broken-agent".into())));
    let (engine, _executions) = engine(
        registry,
        bus,
        EngineConfig { default_step_timeout: Duration::from_millis(50), ..EngineConfig::default() },
    );

    let execution = engine.start(definition, json!({}), TriggeredBy::Manual, None, None).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert_eq!(execution.step(&pe_domain::StepId::new("a")).unwrap().status, StepStatus::Completed);

    tokio::time::sleep(Duration::from_millis(20)).await;
    let events = log.lock().unwrap().clone();
    let started_idx = events.iter().position(|e| *e == EventType::CompensationStarted).unwrap();
    let completed_idx = events.iter().position(|e| *e == EventType::CompensationCompleted).unwrap();
    assert!(started_idx < completed_idx);
    assert_eq!(events.iter().filter(|e| **e == EventType::CompensationCompleted).count(), 1);
}

/// An `AgentGateway` whose only unavailable agent is the given name, used so
/// the happy-path step in the compensation scenario still succeeds.
struct UnavailableForAgent(String);

#[async_trait]
impl AgentGateway for UnavailableForAgent {
    async fn is_available(&self, agent: &str) -> bool {
        agent != self.0
    }

    async fn send_message(
        &self,
        agent: &str,
        message: &str,
        _model: Option<&str>,
        _temperature: Option<f64>,
    ) -> Result<AgentResponse, AgentGatewayError> {
        if agent == self.0 {
            return Err(AgentGatewayError::Unavailable(agent.to_string()));
        }
        Ok(AgentResponse { response: json!({ "echo": message }), cost: None, token_usage: None })
    }
}

/// `SubProcessHandler` needs a `ProcessRunner` before the engine it recurses
/// into exists; this mirrors `pe-server::runner::EngineHandle` for tests
/// that don't depend on the `pe-server` crate.
mod pe_server_test_support {
    use async_trait::async_trait;
    use pe_domain::{ExecutionId, StepId};
    use pe_engine::ExecutionEngine;
    use pe_handlers::{ChildOutcome, ProcessRunner, ProcessRunnerError};
    use serde_json::Value;
    use std::sync::OnceLock;

    #[derive(Default)]
    pub struct StubRunnerSlot(OnceLock<ExecutionEngine>);

    impl StubRunnerSlot {
        pub fn new() -> Self {
            Self(OnceLock::new())
        }

        pub fn set(&self, engine: ExecutionEngine) {
            self.0.set(engine).unwrap_or_else(|_| panic!("set called twice"));
        }
    }

    #[async_trait]
    impl ProcessRunner for StubRunnerSlot {
        async fn start_child(
            &self,
            process_name: &str,
            version: Option<&str>,
            input: Value,
            parent_execution_id: ExecutionId,
            parent_step_id: StepId,
        ) -> Result<ChildOutcome, ProcessRunnerError> {
            self.0
                .get()
                .expect("set must run before any execution reaches a sub_process step")
                .start_child(process_name, version, input, parent_execution_id, parent_step_id)
                .await
        }
    }
}

//! Bridges `pe-handlers::ProcessRunner` to the `ExecutionEngine` that does
//! not exist yet at the point the `HandlerRegistry` must be assembled. The
//! handler registry and the engine are mutually dependent at construction
//! time — the `sub_process` handler needs a `ProcessRunner` to recurse
//! through, and the engine needs the finished registry — so bootstrap hands
//! the `SubProcessHandler` this indirection and fills it in once the engine
//! itself exists.

use async_trait::async_trait;
use pe_domain::{ExecutionId, StepId};
use pe_engine::ExecutionEngine;
use pe_handlers::{ChildOutcome, ProcessRunner, ProcessRunnerError};
use serde_json::Value;
use std::sync::OnceLock;

#[derive(Default)]
pub struct EngineHandle(OnceLock<ExecutionEngine>);

impl EngineHandle {
    pub fn new() -> Self {
        Self(OnceLock::new())
    }

    /// Called exactly once by bootstrap, right after the engine it proxies
    /// to has been constructed.
    pub fn set(&self, engine: ExecutionEngine) {
        self.0
            .set(engine)
            .unwrap_or_else(|_| panic!("EngineHandle::set called more than once"));
    }
}

#[async_trait]
impl ProcessRunner for EngineHandle {
    async fn start_child(
        &self,
        process_name: &str,
        version: Option<&str>,
        input: Value,
        parent_execution_id: ExecutionId,
        parent_step_id: StepId,
    ) -> Result<ChildOutcome, ProcessRunnerError> {
        let engine = self
            .0
            .get()
            .expect("EngineHandle::set must run before any execution can reach a sub_process step");
        engine
            .start_child(process_name, version, input, parent_execution_id, parent_step_id)
            .await
    }
}

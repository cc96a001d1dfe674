//! The `ProcessExecution` aggregate and its `StepExecution` entities.

use crate::error::ErrorCode;
use crate::ids::{DefinitionId, ExecutionId, StepId};
use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Ready,
    Running,
    WaitingApproval,
    Completed,
    Failed,
    Skipped,
}

impl StepStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StepStatus::Completed | StepStatus::Failed | StepStatus::Skipped
        )
    }

    /// Steps in these states satisfy downstream dependencies (skipped counts
    /// the same as completed for dependency purposes).
    pub fn satisfies_dependency(self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Skipped)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggeredBy {
    Manual,
    Schedule,
    Api,
    SubProcess,
    Retry,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepExecution {
    pub step_id: StepId,
    pub status: StepStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub output: Option<serde_json::Value>,
    pub error: Option<String>,
    pub error_code: Option<ErrorCode>,
    pub attempts: u32,
    pub cost: Money,
    pub token_usage: Option<TokenUsage>,
}

impl StepExecution {
    pub fn new(step_id: StepId) -> Self {
        Self {
            step_id,
            status: StepStatus::Pending,
            started_at: None,
            completed_at: None,
            output: None,
            error: None,
            error_code: None,
            attempts: 0,
            cost: Money::ZERO,
            token_usage: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessExecution {
    pub id: ExecutionId,
    pub process_id: DefinitionId,
    pub process_name: String,
    pub process_version: String,
    pub status: ExecutionStatus,
    pub input_data: serde_json::Value,
    pub output_data: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub failed_step_id: Option<StepId>,
    pub step_executions: HashMap<StepId, StepExecution>,
    pub triggered_by: TriggeredBy,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_cost: Money,
    pub retry_of: Option<ExecutionId>,
    pub parent_execution_id: Option<ExecutionId>,
    pub parent_step_id: Option<StepId>,
    pub child_execution_ids: Vec<ExecutionId>,
}

impl ProcessExecution {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        process_id: DefinitionId,
        process_name: impl Into<String>,
        process_version: impl Into<String>,
        input_data: serde_json::Value,
        triggered_by: TriggeredBy,
        parent_execution_id: Option<ExecutionId>,
        parent_step_id: Option<StepId>,
    ) -> Self {
        Self {
            id: ExecutionId::new(),
            process_id,
            process_name: process_name.into(),
            process_version: process_version.into(),
            status: ExecutionStatus::Pending,
            input_data,
            output_data: None,
            error_message: None,
            failed_step_id: None,
            step_executions: HashMap::new(),
            triggered_by,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            total_cost: Money::ZERO,
            retry_of: None,
            parent_execution_id,
            parent_step_id,
            child_execution_ids: Vec::new(),
        }
    }

    pub fn step_mut(&mut self, id: &StepId) -> Option<&mut StepExecution> {
        self.step_executions.get_mut(id)
    }

    pub fn step(&self, id: &StepId) -> Option<&StepExecution> {
        self.step_executions.get(id)
    }

    pub fn all_terminal(&self) -> bool {
        self.step_executions
            .values()
            .all(|s| s.status.is_terminal())
    }

    pub fn has_failed_steps(&self) -> bool {
        self.step_executions
            .values()
            .any(|s| s.status == StepStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_exec() -> ProcessExecution {
        ProcessExecution::new(
            DefinitionId::new(),
            "p",
            "1.0",
            json!({}),
            TriggeredBy::Manual,
            None,
            None,
        )
    }

    #[test]
    fn fresh_execution_has_no_child_ids_and_is_pending() {
        let exec = new_exec();
        assert_eq!(exec.status, ExecutionStatus::Pending);
        assert!(exec.child_execution_ids.is_empty());
    }

    #[test]
    fn all_terminal_is_true_when_no_steps_exist() {
        let exec = new_exec();
        assert!(exec.all_terminal());
    }

    #[test]
    fn all_terminal_false_while_a_step_is_running() {
        let mut exec = new_exec();
        let mut a = StepExecution::new(StepId::from("a"));
        a.status = StepStatus::Completed;
        let mut b = StepExecution::new(StepId::from("b"));
        b.status = StepStatus::Running;
        exec.step_executions.insert(a.step_id.clone(), a);
        exec.step_executions.insert(b.step_id.clone(), b);
        assert!(!exec.all_terminal());
    }

    #[test]
    fn has_failed_steps_detects_failure() {
        let mut exec = new_exec();
        let mut a = StepExecution::new(StepId::from("a"));
        a.status = StepStatus::Failed;
        exec.step_executions.insert(a.step_id.clone(), a);
        assert!(exec.has_failed_steps());
    }

    #[test]
    fn skipped_satisfies_dependency_same_as_completed() {
        assert!(StepStatus::Skipped.satisfies_dependency());
        assert!(StepStatus::Completed.satisfies_dependency());
        assert!(!StepStatus::Failed.satisfies_dependency());
    }
}

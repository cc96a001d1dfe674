//! Repository contracts. Each `save` is atomic for the whole
//! aggregate: a crash must never observe a half-written execution.

use crate::error::StoreError;
use async_trait::async_trait;
use pe_domain::definition::{DefinitionStatus, Version};
use pe_domain::{ApprovalRequest, ApprovalStatus, DefinitionId, ExecutionId, ProcessDefinition};
use pe_domain::{ExecutionStatus, ProcessExecution, StepId};

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait DefinitionStore: Send + Sync {
    async fn save(&self, definition: ProcessDefinition) -> StoreResult<()>;
    async fn get_by_id(&self, id: DefinitionId) -> StoreResult<ProcessDefinition>;

    /// Latest published version when `version` is `None`.
    async fn get_by_name(
        &self,
        name: &str,
        version: Option<Version>,
    ) -> StoreResult<ProcessDefinition>;

    async fn list(
        &self,
        status: Option<DefinitionStatus>,
        limit: usize,
        offset: usize,
    ) -> StoreResult<Vec<ProcessDefinition>>;

    async fn count(&self, status: Option<DefinitionStatus>) -> StoreResult<usize>;

    async fn delete(&self, id: DefinitionId) -> StoreResult<()>;
}

#[async_trait]
pub trait ExecutionStore: Send + Sync {
    async fn save(&self, execution: ProcessExecution) -> StoreResult<()>;
    async fn get_by_id(&self, id: ExecutionId) -> StoreResult<ProcessExecution>;

    async fn list(
        &self,
        status: Option<ExecutionStatus>,
        process_id: Option<DefinitionId>,
        limit: usize,
        offset: usize,
    ) -> StoreResult<Vec<ProcessExecution>>;

    async fn list_by_parent(&self, parent_id: ExecutionId) -> StoreResult<Vec<ProcessExecution>>;
}

#[async_trait]
pub trait ApprovalStore: Send + Sync {
    async fn save(&self, approval: ApprovalRequest) -> StoreResult<()>;
    async fn get(&self, id: pe_domain::ApprovalId) -> StoreResult<ApprovalRequest>;

    async fn get_by_execution_step(
        &self,
        execution_id: ExecutionId,
        step_id: &StepId,
    ) -> StoreResult<Option<ApprovalRequest>>;

    async fn list_pending_for(&self, user: Option<&str>) -> StoreResult<Vec<ApprovalRequest>>;

    async fn list(
        &self,
        status: Option<ApprovalStatus>,
        process_name: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> StoreResult<Vec<ApprovalRequest>>;
}

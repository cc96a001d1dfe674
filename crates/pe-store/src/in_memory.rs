//! `dashmap`-backed in-memory repositories. Suitable for tests, single-process
//! deployments, and as a template for a durable (e.g. SQL-backed) store that
//! implements the same traits.

use crate::error::StoreError;
use crate::traits::{ApprovalStore, DefinitionStore, ExecutionStore, StoreResult};
use async_trait::async_trait;
use dashmap::DashMap;
use pe_domain::definition::{DefinitionStatus, Version};
use pe_domain::{
    ApprovalId, ApprovalRequest, ApprovalStatus, DefinitionId, ExecutionId, ExecutionStatus,
    ProcessDefinition, ProcessExecution, StepId,
};
use std::sync::Arc;

#[derive(Debug, Default, Clone)]
pub struct InMemoryDefinitionStore {
    by_id: Arc<DashMap<DefinitionId, ProcessDefinition>>,
}

impl InMemoryDefinitionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DefinitionStore for InMemoryDefinitionStore {
    async fn save(&self, definition: ProcessDefinition) -> StoreResult<()> {
        // (name, version) uniqueness, excluding the aggregate being re-saved.
        let collision = self.by_id.iter().any(|e| {
            e.key() != &definition.id
                && e.value().name == definition.name
                && e.value().version == definition.version
        });
        if collision {
            return Err(StoreError::Conflict(format!(
                "definition '{}' v{} already exists",
                definition.name, definition.version
            )));
        }
        self.by_id.insert(definition.id, definition);
        Ok(())
    }

    async fn get_by_id(&self, id: DefinitionId) -> StoreResult<ProcessDefinition> {
        self.by_id
            .get(&id)
            .map(|e| e.value().clone())
            .ok_or_else(|| StoreError::not_found("ProcessDefinition", id.to_string()))
    }

    async fn get_by_name(
        &self,
        name: &str,
        version: Option<Version>,
    ) -> StoreResult<ProcessDefinition> {
        let mut candidates: Vec<ProcessDefinition> = self
            .by_id
            .iter()
            .filter(|e| e.value().name == name)
            .map(|e| e.value().clone())
            .collect();

        if let Some(v) = version {
            return candidates
                .into_iter()
                .find(|d| d.version == v)
                .ok_or_else(|| StoreError::not_found("ProcessDefinition", format!("{name}@{v}")));
        }

        // Latest published when no version requested.
        candidates.retain(|d| d.status == DefinitionStatus::Published);
        candidates.sort_by_key(|d| d.version);
        candidates
            .pop()
            .ok_or_else(|| StoreError::not_found("ProcessDefinition", format!("{name} (published)")))
    }

    async fn list(
        &self,
        status: Option<DefinitionStatus>,
        limit: usize,
        offset: usize,
    ) -> StoreResult<Vec<ProcessDefinition>> {
        let mut all: Vec<ProcessDefinition> = self
            .by_id
            .iter()
            .filter(|e| status.is_none_or(|s| e.value().status == s))
            .map(|e| e.value().clone())
            .collect();
        all.sort_by_key(|d| d.created_at);
        Ok(all.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&self, status: Option<DefinitionStatus>) -> StoreResult<usize> {
        Ok(self
            .by_id
            .iter()
            .filter(|e| status.is_none_or(|s| e.value().status == s))
            .count())
    }

    async fn delete(&self, id: DefinitionId) -> StoreResult<()> {
        self.by_id
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("ProcessDefinition", id.to_string()))
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryExecutionStore {
    by_id: Arc<DashMap<ExecutionId, ProcessExecution>>,
}

impl InMemoryExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExecutionStore for InMemoryExecutionStore {
    async fn save(&self, execution: ProcessExecution) -> StoreResult<()> {
        self.by_id.insert(execution.id, execution);
        Ok(())
    }

    async fn get_by_id(&self, id: ExecutionId) -> StoreResult<ProcessExecution> {
        self.by_id
            .get(&id)
            .map(|e| e.value().clone())
            .ok_or_else(|| StoreError::not_found("ProcessExecution", id.to_string()))
    }

    async fn list(
        &self,
        status: Option<ExecutionStatus>,
        process_id: Option<DefinitionId>,
        limit: usize,
        offset: usize,
    ) -> StoreResult<Vec<ProcessExecution>> {
        let mut all: Vec<ProcessExecution> = self
            .by_id
            .iter()
            .filter(|e| status.is_none_or(|s| e.value().status == s))
            .filter(|e| process_id.is_none_or(|p| e.value().process_id == p))
            .map(|e| e.value().clone())
            .collect();
        all.sort_by_key(|e| e.created_at);
        Ok(all.into_iter().skip(offset).take(limit).collect())
    }

    async fn list_by_parent(&self, parent_id: ExecutionId) -> StoreResult<Vec<ProcessExecution>> {
        Ok(self
            .by_id
            .iter()
            .filter(|e| e.value().parent_execution_id == Some(parent_id))
            .map(|e| e.value().clone())
            .collect())
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryApprovalStore {
    by_id: Arc<DashMap<ApprovalId, ApprovalRequest>>,
}

impl InMemoryApprovalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApprovalStore for InMemoryApprovalStore {
    async fn save(&self, approval: ApprovalRequest) -> StoreResult<()> {
        if approval.status == ApprovalStatus::Pending {
            let collision = self.by_id.iter().any(|e| {
                e.key() != &approval.id
                    && e.value().execution_id == approval.execution_id
                    && e.value().step_id == approval.step_id
                    && e.value().status == ApprovalStatus::Pending
            });
            if collision {
                return Err(StoreError::Conflict(format!(
                    "a pending approval already exists for execution {} step {}",
                    approval.execution_id, approval.step_id
                )));
            }
        }
        self.by_id.insert(approval.id, approval);
        Ok(())
    }

    async fn get(&self, id: ApprovalId) -> StoreResult<ApprovalRequest> {
        self.by_id
            .get(&id)
            .map(|e| e.value().clone())
            .ok_or_else(|| StoreError::not_found("ApprovalRequest", id.to_string()))
    }

    async fn get_by_execution_step(
        &self,
        execution_id: ExecutionId,
        step_id: &StepId,
    ) -> StoreResult<Option<ApprovalRequest>> {
        Ok(self
            .by_id
            .iter()
            .filter(|e| e.value().execution_id == execution_id && &e.value().step_id == step_id)
            .map(|e| e.value().clone())
            .max_by_key(|a| a.created_at))
    }

    async fn list_pending_for(&self, user: Option<&str>) -> StoreResult<Vec<ApprovalRequest>> {
        Ok(self
            .by_id
            .iter()
            .filter(|e| e.value().status == ApprovalStatus::Pending)
            .filter(|e| user.is_none_or(|u| e.value().is_assignee(u)))
            .map(|e| e.value().clone())
            .collect())
    }

    async fn list(
        &self,
        status: Option<ApprovalStatus>,
        process_name: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> StoreResult<Vec<ApprovalRequest>> {
        let _ = process_name; // no process reference is stored directly; joins happen upstream.
        let mut all: Vec<ApprovalRequest> = self
            .by_id
            .iter()
            .filter(|e| status.is_none_or(|s| e.value().status == s))
            .map(|e| e.value().clone())
            .collect();
        all.sort_by_key(|a| a.created_at);
        Ok(all.into_iter().skip(offset).take(limit).collect())
    }
}

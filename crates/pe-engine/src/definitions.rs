//! Definition lifecycle operations: create/update/publish/archive/
//! create-new-version/list/get. Thin glue between `pe-validator`'s pure
//! pipeline and the `DefinitionStore`, since the validator crate stays
//! persistence-free by design.

use crate::error::{EngineError, EngineResult};
use pe_domain::definition::{DefinitionStatus, Version};
use pe_domain::{DefinitionId, ProcessDefinition};
use pe_store::DefinitionStore;
use pe_validator::ValidationResult;
use std::sync::Arc;

pub struct DefinitionService {
    store: Arc<dyn DefinitionStore>,
}

impl DefinitionService {
    pub fn new(store: Arc<dyn DefinitionStore>) -> Self {
        Self { store }
    }

    fn into_definition(result: ValidationResult) -> EngineResult<ProcessDefinition> {
        if !result.is_valid() {
            return Err(EngineError::Validation(result.errors));
        }
        Ok(result.definition.expect("a valid result always carries a parsed definition"))
    }

    /// `create`: validates the raw document and persists it as a fresh draft.
    pub async fn create(&self, raw: &str, created_by: &str) -> EngineResult<ProcessDefinition> {
        let definition = Self::into_definition(pe_validator::validate(raw, created_by))?;
        self.store.save(definition.clone()).await?;
        Ok(definition)
    }

    /// `update`: only drafts are mutable; the lineage's id, version,
    /// creator and creation time are preserved across the edit.
    pub async fn update(&self, id: DefinitionId, raw: &str) -> EngineResult<ProcessDefinition> {
        let existing = self.store.get_by_id(id).await?;
        existing.ensure_mutable()?;

        let mut updated = Self::into_definition(pe_validator::validate(raw, &existing.created_by))?;
        updated.id = existing.id;
        updated.created_by = existing.created_by;
        updated.created_at = existing.created_at;
        updated.version = existing.version;
        updated.status = DefinitionStatus::Draft;

        self.store.save(updated.clone()).await?;
        Ok(updated)
    }

    /// `publish`: draft -> published.
    pub async fn publish(&self, id: DefinitionId) -> EngineResult<ProcessDefinition> {
        let mut definition = self.store.get_by_id(id).await?;
        definition.publish()?;
        self.store.save(definition.clone()).await?;
        Ok(definition)
    }

    /// `archive`: published -> archived.
    pub async fn archive(&self, id: DefinitionId) -> EngineResult<ProcessDefinition> {
        let mut definition = self.store.get_by_id(id).await?;
        definition.archive()?;
        self.store.save(definition.clone()).await?;
        Ok(definition)
    }

    /// `create_new_version`: clones the definition into a fresh draft with a
    /// bumped minor version, the next entry in the `(name, version)` lineage.
    pub async fn create_new_version(&self, id: DefinitionId, created_by: &str) -> EngineResult<ProcessDefinition> {
        let existing = self.store.get_by_id(id).await?;
        let next = existing.create_new_version(created_by);
        self.store.save(next.clone()).await?;
        Ok(next)
    }

    pub async fn get(&self, id: DefinitionId) -> EngineResult<ProcessDefinition> {
        Ok(self.store.get_by_id(id).await?)
    }

    pub async fn get_by_name(&self, name: &str, version: Option<Version>) -> EngineResult<ProcessDefinition> {
        Ok(self.store.get_by_name(name, version).await?)
    }

    pub async fn list(&self, status: Option<DefinitionStatus>, limit: usize, offset: usize) -> EngineResult<Vec<ProcessDefinition>> {
        Ok(self.store.list(status, limit, offset).await?)
    }

    pub async fn count(&self, status: Option<DefinitionStatus>) -> EngineResult<usize> {
        Ok(self.store.count(status).await?)
    }
}

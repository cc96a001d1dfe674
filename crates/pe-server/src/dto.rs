//! Request/response bodies for the transport layer. Response bodies
//! are mostly the domain aggregates themselves — they already derive
//! `Serialize` — so this module only covers what the wire format needs that
//! the domain types don't carry on their own: request payloads and list
//! filters.

use pe_domain::definition::{DefinitionStatus, Version};
use pe_domain::{ApprovalId, ExecutionStatus, TriggeredBy};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CreateDefinitionRequest {
    pub document: String,
    pub created_by: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDefinitionRequest {
    pub document: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct ListDefinitionsQuery {
    pub status: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ListDefinitionsQuery {
    pub fn status(&self) -> Result<Option<DefinitionStatus>, String> {
        self.status.as_deref().map(parse_definition_status).transpose()
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct GetDefinitionByNameQuery {
    pub version: Option<String>,
}

impl GetDefinitionByNameQuery {
    pub fn version(&self) -> Result<Option<Version>, String> {
        self.version.as_deref().map(parse_version).transpose()
    }
}

#[derive(Debug, Deserialize)]
pub struct StartExecutionRequest {
    pub definition_id: uuid::Uuid,
    #[serde(default)]
    pub input: serde_json::Value,
    #[serde(default = "default_triggered_by")]
    pub triggered_by: TriggeredByDto,
}

fn default_triggered_by() -> TriggeredByDto {
    TriggeredByDto::Api
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum TriggeredByDto {
    Manual,
    Api,
}

impl From<TriggeredByDto> for TriggeredBy {
    fn from(dto: TriggeredByDto) -> Self {
        match dto {
            TriggeredByDto::Manual => TriggeredBy::Manual,
            TriggeredByDto::Api => TriggeredBy::Api,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct ListExecutionsQuery {
    pub status: Option<String>,
    pub process_id: Option<uuid::Uuid>,
    pub parent_execution_id: Option<uuid::Uuid>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ListExecutionsQuery {
    pub fn status(&self) -> Result<Option<ExecutionStatus>, String> {
        self.status.as_deref().map(parse_execution_status).transpose()
    }
}

#[derive(Debug, Deserialize)]
pub struct CancelExecutionRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct DecideApprovalRequest {
    pub decision: DecisionDto,
    pub actor: String,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecisionDto {
    Approve,
    Reject,
}

#[derive(Debug, Deserialize, Default)]
pub struct ListPendingApprovalsQuery {
    pub user: Option<String>,
}

pub fn parse_definition_status(s: &str) -> Result<DefinitionStatus, String> {
    match s {
        "draft" => Ok(DefinitionStatus::Draft),
        "published" => Ok(DefinitionStatus::Published),
        "archived" => Ok(DefinitionStatus::Archived),
        other => Err(format!("unknown definition status '{other}'")),
    }
}

pub fn parse_execution_status(s: &str) -> Result<ExecutionStatus, String> {
    match s {
        "pending" => Ok(ExecutionStatus::Pending),
        "running" => Ok(ExecutionStatus::Running),
        "paused" => Ok(ExecutionStatus::Paused),
        "completed" => Ok(ExecutionStatus::Completed),
        "failed" => Ok(ExecutionStatus::Failed),
        "cancelled" => Ok(ExecutionStatus::Cancelled),
        other => Err(format!("unknown execution status '{other}'")),
    }
}

pub fn parse_version(s: &str) -> Result<Version, String> {
    let mut parts = s.split('.');
    let major = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(|| format!("invalid version '{s}'"))?;
    let minor = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(|| format!("invalid version '{s}'"))?;
    Ok(Version::new(major, minor))
}

/// Parses the `approval_id` path segment; kept separate from the opaque-id
/// `FromStr` impls (ids are UUID-backed but deliberately don't implement
/// `FromStr` themselves, to keep parsing concerns out of the domain crate).
pub fn parse_approval_id(raw: &str) -> Result<ApprovalId, String> {
    raw.parse::<uuid::Uuid>()
        .map(ApprovalId::from)
        .map_err(|e| format!("invalid approval id '{raw}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_definition_statuses() {
        assert_eq!(parse_definition_status("draft").unwrap(), DefinitionStatus::Draft);
        assert!(parse_definition_status("bogus").is_err());
    }

    #[test]
    fn parses_major_minor_version() {
        assert_eq!(parse_version("1.2").unwrap(), Version::new(1, 2));
        assert!(parse_version("1").is_err());
    }
}

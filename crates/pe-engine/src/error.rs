//! Errors surfaced by the engine's public contract.

use pe_domain::{ErrorCode, ValidationIssue};

#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    StateForbidden(String),

    #[error("{}", join_issues(.0))]
    Validation(Vec<ValidationIssue>),

    #[error("store error: {0}")]
    Store(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("internal engine error: {0}")]
    Internal(String),
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("{}: {}", i.path, i.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl EngineError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            EngineError::NotFound(_) => ErrorCode::NotFound,
            EngineError::StateForbidden(_) => ErrorCode::StateForbidden,
            EngineError::Validation(_) => ErrorCode::ValidationError,
            EngineError::Store(_) => ErrorCode::Internal,
            // Not in the domain error-code table (an API/transport concern);
            // the closest domain code is the one a caller should map to 403.
            EngineError::Unauthorized(_) => ErrorCode::StateForbidden,
            EngineError::Internal(_) => ErrorCode::Internal,
        }
    }
}

impl From<pe_store::StoreError> for EngineError {
    fn from(e: pe_store::StoreError) -> Self {
        match e {
            pe_store::StoreError::NotFound { .. } => EngineError::NotFound(e.to_string()),
            pe_store::StoreError::Conflict(_) => EngineError::Store(e.to_string()),
        }
    }
}

impl From<pe_domain::DomainError> for EngineError {
    fn from(e: pe_domain::DomainError) -> Self {
        match e {
            pe_domain::DomainError::StateForbidden(msg) => EngineError::StateForbidden(msg),
            other => EngineError::Validation(vec![ValidationIssue::new("$", other.to_string())]),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

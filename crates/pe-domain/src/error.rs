//! Error taxonomy shared by every layer of the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The machine-readable error codes shared across the engine. Carried on
/// `StepExecution`, `StepResult::fail`, and surfaced to API callers
/// alongside a human message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    NotFound,
    StateForbidden,
    AgentUnavailable,
    Timeout,
    ApprovalRejected,
    ApprovalTimeout,
    ProcessNotFound,
    SubProcessFailed,
    UnexpectedState,
    InvalidConfig,
    NotificationFailed,
    Internal,
}

impl ErrorCode {
    /// The `NON_RETRYABLE` set: these bypass the step's retry policy
    /// regardless of attempts remaining.
    pub fn is_retryable(self) -> bool {
        !matches!(
            self,
            ErrorCode::ApprovalRejected
                | ErrorCode::ApprovalTimeout
                | ErrorCode::ValidationError
                | ErrorCode::InvalidConfig
                | ErrorCode::Timeout
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::StateForbidden => "STATE_FORBIDDEN",
            ErrorCode::AgentUnavailable => "AGENT_UNAVAILABLE",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::ApprovalRejected => "APPROVAL_REJECTED",
            ErrorCode::ApprovalTimeout => "APPROVAL_TIMEOUT",
            ErrorCode::ProcessNotFound => "PROCESS_NOT_FOUND",
            ErrorCode::SubProcessFailed => "SUB_PROCESS_FAILED",
            ErrorCode::UnexpectedState => "UNEXPECTED_STATE",
            ErrorCode::InvalidConfig => "INVALID_CONFIG",
            ErrorCode::NotificationFailed => "NOTIFICATION_FAILED",
            ErrorCode::Internal => "INTERNAL",
        };
        write!(f, "{s}")
    }
}

/// A single validation failure, path-qualified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Domain-level invariant violations raised by aggregate constructors and
/// lifecycle transitions.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("duplicate step id '{0}' within process")]
    DuplicateStepId(String),

    #[error("step '{0}' depends on unknown step '{1}'")]
    UnknownDependency(String, String),

    #[error("dependency cycle detected involving step '{0}'")]
    DependencyCycle(String),

    #[error("process must have at least one step")]
    NoSteps,

    #[error("goto_step target '{0}' does not exist")]
    UnknownGotoTarget(String),

    #[error("invalid process name '{0}': must match ^[a-z][a-z0-9-]*$ and be 1-64 chars")]
    InvalidProcessName(String),

    #[error("invalid step id '{0}': must match ^[a-z0-9_-]+$")]
    InvalidStepId(String),

    #[error("state transition forbidden: {0}")]
    StateForbidden(String),

    #[error("roles.executor is required when roles are present for step '{0}'")]
    MissingExecutor(String),
}

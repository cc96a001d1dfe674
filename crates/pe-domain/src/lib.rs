//! Domain model for the Process Engine: aggregates, entities, and value
//! objects that make up the Definition and Execution lineages.

pub mod approval;
pub mod definition;
pub mod duration;
pub mod error;
pub mod execution;
pub mod graph;
pub mod ids;
pub mod money;
pub mod schedule;

pub use approval::{ApprovalRequest, ApprovalStatus};
pub use definition::{
    Compensation, DefinitionStatus, ErrorAction, ErrorPolicy, GatewayRoute, GatewayType,
    NotificationChannel, Output, ProcessDefinition, Roles, RetryPolicy, StepConfig,
    StepDefinition, StepType, Trigger, Version,
};
pub use error::{DomainError, ErrorCode, ValidationIssue};
pub use execution::{
    ExecutionStatus, ProcessExecution, StepExecution, StepStatus, TokenUsage, TriggeredBy,
};
pub use graph::topological_order;
pub use ids::{ApprovalId, DefinitionId, ExecutionId, StepId};
pub use money::Money;

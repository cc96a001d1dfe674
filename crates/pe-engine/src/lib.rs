//! The execution engine: the DAG scheduler, retry/backoff, compensation
//! runner, and the thin service layer over definitions and approvals that
//! the transport layer calls into.

pub mod approvals;
pub mod compensation;
pub mod config;
pub mod definitions;
pub mod engine;
pub mod error;
pub mod resolver;

pub use approvals::{ApprovalDecision, ApprovalService};
pub use config::EngineConfig;
pub use definitions::DefinitionService;
pub use engine::ExecutionEngine;
pub use error::{EngineError, EngineResult};

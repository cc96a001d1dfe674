//! Repositories for Definitions, Executions, and Approvals.

pub mod error;
pub mod in_memory;
pub mod traits;

pub use error::StoreError;
pub use in_memory::{InMemoryApprovalStore, InMemoryDefinitionStore, InMemoryExecutionStore};
pub use traits::{ApprovalStore, DefinitionStore, ExecutionStore, StoreResult};

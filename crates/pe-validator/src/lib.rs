//! Declarative process-definition parsing and validation pipeline.
//!
//! `validate` is pure and side-effect free; persisting the resulting draft
//! is the caller's job once it holds a `DefinitionStore` — that glue lives
//! in `pe-engine`, not here.

pub mod pipeline;

pub use pipeline::{validate, validate_with_context, AgentAvailability, SubProcessLookup, ValidationResult};

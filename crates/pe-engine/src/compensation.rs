//! The compensation runner: on `fail_execution` only, gather every
//! completed step with a `compensation` config and run them in reverse
//! completion order.

use pe_domain::{ProcessDefinition, ProcessExecution, StepDefinition, StepStatus};

/// Completed steps with a configured compensation, in reverse order of
/// `completed_at`. Ties (equal timestamps) fall back to reverse
/// definition order for determinism.
pub fn steps_to_compensate<'a>(
    definition: &'a ProcessDefinition,
    execution: &ProcessExecution,
) -> Vec<&'a StepDefinition> {
    let mut candidates: Vec<(&StepDefinition, chrono::DateTime<chrono::Utc>, usize)> = definition
        .steps
        .iter()
        .enumerate()
        .filter(|(_, step)| step.compensation.is_some())
        .filter_map(|(idx, step)| {
            let se = execution.step(&step.id)?;
            if se.status != StepStatus::Completed {
                return None;
            }
            Some((step, se.completed_at.unwrap_or_default(), idx))
        })
        .collect();

    candidates.sort_by(|a, b| b.1.cmp(&a.1).then(b.2.cmp(&a.2)));
    candidates.into_iter().map(|(step, _, _)| step).collect()
}

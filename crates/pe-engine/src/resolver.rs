//! The pure, stateless `DependencyResolver`: given a definition and an
//! execution, which steps are ready, running, waiting, or terminal.

use pe_domain::{ProcessDefinition, ProcessExecution, StepId, StepStatus};

/// Steps with status `pending` whose dependencies are all in
/// `{completed, skipped}` (skipped satisfies a dependency the same as
/// completed), plus any step the engine has explicitly forced to `ready`
/// via a `goto_step` error action regardless of whether its own
/// dependencies are satisfied yet.
pub fn get_ready_steps(definition: &ProcessDefinition, execution: &ProcessExecution) -> Vec<StepId> {
    definition
        .steps
        .iter()
        .filter(|step| {
            let Some(se) = execution.step(&step.id) else { return false };
            match se.status {
                StepStatus::Ready => true,
                StepStatus::Pending => step.dependencies.iter().all(|dep| {
                    execution
                        .step(dep)
                        .is_some_and(|d| d.status.satisfies_dependency())
                }),
                _ => false,
            }
        })
        .map(|step| step.id.clone())
        .collect()
}

pub fn get_running_steps(execution: &ProcessExecution) -> Vec<StepId> {
    execution
        .step_executions
        .values()
        .filter(|se| se.status == StepStatus::Running)
        .map(|se| se.step_id.clone())
        .collect()
}

pub fn get_waiting_steps(execution: &ProcessExecution) -> Vec<StepId> {
    execution
        .step_executions
        .values()
        .filter(|se| se.status == StepStatus::WaitingApproval)
        .map(|se| se.step_id.clone())
        .collect()
}

pub fn is_complete(execution: &ProcessExecution) -> bool {
    execution.all_terminal()
}

pub fn has_failed_steps(execution: &ProcessExecution) -> bool {
    execution.has_failed_steps()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pe_domain::definition::{DefinitionStatus, ErrorPolicy, RetryPolicy, StepConfig};
    use pe_domain::{DefinitionId, ExecutionId, StepDefinition, StepExecution, TriggeredBy};
    use std::collections::HashSet;

    fn step(id: &str, deps: &[&str]) -> StepDefinition {
        StepDefinition {
            id: StepId::new(id),
            name: None,
            config: StepConfig::Timer { duration: Some(std::time::Duration::from_secs(1)), until: None },
            dependencies: deps.iter().map(|d| StepId::new(*d)).collect::<HashSet<_>>(),
            condition: None,
            retry_policy: RetryPolicy::default(),
            error_policy: ErrorPolicy::default(),
            compensation: None,
            roles: None,
            timeout: None,
        }
    }

    fn definition(steps: Vec<StepDefinition>) -> ProcessDefinition {
        let now = Utc::now();
        ProcessDefinition {
            id: DefinitionId::new(),
            name: "p".into(),
            description: None,
            version: pe_domain::definition::Version::initial(),
            status: DefinitionStatus::Published,
            steps,
            outputs: vec![],
            triggers: vec![],
            created_by: "t".into(),
            created_at: now,
            updated_at: now,
        }
    }

    fn execution_for(definition: &ProcessDefinition) -> ProcessExecution {
        let mut exec = ProcessExecution::new(
            definition.id,
            definition.name.clone(),
            definition.version.to_string(),
            serde_json::json!({}),
            TriggeredBy::Manual,
            None,
            None,
        );
        for step in &definition.steps {
            exec.step_executions
                .insert(step.id.clone(), StepExecution::new(step.id.clone()));
        }
        exec
    }

    #[test]
    fn ready_steps_have_no_unmet_dependencies() {
        let def = definition(vec![step("a", &[]), step("b", &["a"])]);
        let exec = execution_for(&def);
        let ready = get_ready_steps(&def, &exec);
        assert_eq!(ready, vec![StepId::new("a")]);
    }

    #[test]
    fn completed_dependency_unblocks_successor() {
        let def = definition(vec![step("a", &[]), step("b", &["a"])]);
        let mut exec = execution_for(&def);
        exec.step_mut(&StepId::new("a")).unwrap().status = StepStatus::Completed;
        let ready = get_ready_steps(&def, &exec);
        assert_eq!(ready, vec![StepId::new("b")]);
    }

    #[test]
    fn skipped_dependency_unblocks_successor_same_as_completed() {
        let def = definition(vec![step("a", &[]), step("b", &["a"])]);
        let mut exec = execution_for(&def);
        exec.step_mut(&StepId::new("a")).unwrap().status = StepStatus::Skipped;
        let ready = get_ready_steps(&def, &exec);
        assert_eq!(ready, vec![StepId::new("b")]);
    }

    #[test]
    fn is_complete_when_every_step_is_terminal() {
        let def = definition(vec![step("a", &[])]);
        let mut exec = execution_for(&def);
        assert!(!is_complete(&exec));
        exec.step_mut(&StepId::new("a")).unwrap().status = StepStatus::Completed;
        assert!(is_complete(&exec));
    }

    #[test]
    fn has_failed_steps_detects_any_failure() {
        let def = definition(vec![step("a", &[])]);
        let mut exec = execution_for(&def);
        assert!(!has_failed_steps(&exec));
        exec.step_mut(&StepId::new("a")).unwrap().status = StepStatus::Failed;
        assert!(has_failed_steps(&exec));
    }
}

//! The `human_approval` step handler.

use crate::context::{StepContext, StepHandler, StepResult};
use crate::expr::ExpressionEvaluator;
use async_trait::async_trait;
use chrono::Utc;
use pe_domain::{ApprovalRequest, ApprovalStatus, ErrorCode, StepConfig, StepType};
use pe_store::ApprovalStore;
use std::sync::Arc;

/// Bridges the engine's per-step dispatch to the approval store.
/// On first dispatch it creates a pending request and returns `wait`; on
/// re-dispatch after `resume` it reloads the request and reports the
/// decision, or expires it once past deadline.
pub struct HumanApprovalHandler {
    approvals: Arc<dyn ApprovalStore>,
    expr: ExpressionEvaluator,
}

impl HumanApprovalHandler {
    pub fn new(approvals: Arc<dyn ApprovalStore>) -> Self {
        Self { approvals, expr: ExpressionEvaluator::new() }
    }
}

#[async_trait]
impl StepHandler for HumanApprovalHandler {
    fn step_type(&self) -> StepType {
        StepType::HumanApproval
    }

    async fn execute(&self, ctx: &StepContext, config: &StepConfig) -> StepResult {
        let StepConfig::HumanApproval { title, description, assignees, timeout } = config else {
            return StepResult::fail(
                "human_approval handler received a non-human_approval config",
                ErrorCode::InvalidConfig,
            );
        };

        let existing = match self
            .approvals
            .get_by_execution_step(ctx.execution_id, ctx.step_id())
            .await
        {
            Ok(existing) => existing,
            Err(e) => {
                return StepResult::fail(format!("approval lookup failed: {e}"), ErrorCode::Internal)
            }
        };

        match existing {
            None => {
                let title = title
                    .as_deref()
                    .map(|t| self.expr.substitute(t, ctx))
                    .unwrap_or_else(|| format!("Approval required: {}", ctx.step_id()));
                let description = description.as_deref().map(|d| self.expr.substitute(d, ctx));
                let deadline = Utc::now() + *timeout;
                let request = ApprovalRequest::new(
                    ctx.execution_id,
                    ctx.step_id().clone(),
                    title.clone(),
                    description,
                    assignees.clone(),
                    Some(deadline),
                );
                let approval_id = request.id;
                if let Err(e) = self.approvals.save(request).await {
                    return StepResult::fail(format!("failed to persist approval: {e}"), ErrorCode::Internal);
                }
                StepResult::wait(serde_json::json!({ "approval_id": approval_id.to_string(), "title": title }))
            }
            Some(mut request) => match request.status {
                ApprovalStatus::Pending => {
                    if request.is_past_deadline(Utc::now()) {
                        request.expire();
                        if let Err(e) = self.approvals.save(request).await {
                            return StepResult::fail(format!("failed to persist approval expiry: {e}"), ErrorCode::Internal);
                        }
                        StepResult::fail("Approval timed out", ErrorCode::ApprovalTimeout)
                    } else {
                        StepResult::wait(serde_json::json!({ "approval_id": request.id.to_string() }))
                    }
                }
                ApprovalStatus::Approved => StepResult::ok(serde_json::json!({
                    "approval_id": request.id.to_string(),
                    "decision": "approved",
                    "decided_by": request.decided_by,
                    "comment": request.decision_comment,
                })),
                ApprovalStatus::Rejected => StepResult::fail(
                    format!(
                        "approval rejected by {}",
                        request.decided_by.as_deref().unwrap_or("unknown")
                    ),
                    ErrorCode::ApprovalRejected,
                ),
                ApprovalStatus::Expired => StepResult::fail("Approval timed out", ErrorCode::ApprovalTimeout),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pe_domain::{ExecutionId, StepDefinition, StepId};
    use pe_store::InMemoryApprovalStore;
    use serde_json::json;
    use std::collections::HashMap;
    use std::time::Duration;

    fn config(timeout: Duration) -> StepConfig {
        StepConfig::HumanApproval {
            title: Some("Approve {{input.order_id}}".into()),
            description: None,
            assignees: vec![],
            timeout,
        }
    }

    fn ctx(execution_id: pe_domain::ExecutionId) -> StepContext {
        let step = StepDefinition {
            id: StepId::new("approve"),
            name: None,
            config: config(Duration::from_secs(3600)),
            dependencies: Default::default(),
            condition: None,
            retry_policy: Default::default(),
            error_policy: Default::default(),
            compensation: None,
            roles: None,
            timeout: None,
        };
        StepContext {
            execution_id,
            process_name: "p".into(),
            process_version: "1.0".into(),
            step_definition: step,
            step_outputs: HashMap::new(),
            input_data: json!({"order_id": "o-7"}),
        }
    }

    #[tokio::test]
    async fn first_dispatch_creates_pending_request_and_waits() {
        let store: Arc<dyn ApprovalStore> = Arc::new(InMemoryApprovalStore::new());
        let handler = HumanApprovalHandler::new(store.clone());
        let execution_id = ExecutionId::new();
        let c = ctx(execution_id);
        let result = handler.execute(&c, &c.step_definition.config).await;
        match result {
            StepResult::Wait { payload } => assert!(payload["title"].as_str().unwrap().contains("o-7")),
            other => panic!("expected wait, got {other:?}"),
        }
        let pending = store.list_pending_for(None).await.unwrap();
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn redispatch_after_approval_returns_ok() {
        let store: Arc<dyn ApprovalStore> = Arc::new(InMemoryApprovalStore::new());
        let handler = HumanApprovalHandler::new(store.clone());
        let execution_id = ExecutionId::new();
        let c = ctx(execution_id);
        handler.execute(&c, &c.step_definition.config).await;

        let mut req = store
            .get_by_execution_step(execution_id, &StepId::new("approve"))
            .await
            .unwrap()
            .unwrap();
        req.approve("alice", Some("lgtm".into()));
        store.save(req).await.unwrap();

        let result = handler.execute(&c, &c.step_definition.config).await;
        match result {
            StepResult::Ok { output, .. } => assert_eq!(output["decision"], "approved"),
            other => panic!("expected ok, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn redispatch_after_rejection_fails_with_approval_rejected() {
        let store: Arc<dyn ApprovalStore> = Arc::new(InMemoryApprovalStore::new());
        let handler = HumanApprovalHandler::new(store.clone());
        let execution_id = ExecutionId::new();
        let c = ctx(execution_id);
        handler.execute(&c, &c.step_definition.config).await;

        let mut req = store
            .get_by_execution_step(execution_id, &StepId::new("approve"))
            .await
            .unwrap()
            .unwrap();
        req.reject("bob", None);
        store.save(req).await.unwrap();

        let result = handler.execute(&c, &c.step_definition.config).await;
        assert!(matches!(result, StepResult::Fail { error_code: ErrorCode::ApprovalRejected, .. }));
    }

    #[tokio::test]
    async fn redispatch_past_deadline_expires_and_fails() {
        let store: Arc<dyn ApprovalStore> = Arc::new(InMemoryApprovalStore::new());
        let handler = HumanApprovalHandler::new(store.clone());
        let execution_id = ExecutionId::new();
        let mut c = ctx(execution_id);
        c.step_definition.config = config(Duration::from_secs(0));
        handler.execute(&c, &c.step_definition.config).await;

        tokio::time::sleep(Duration::from_millis(5)).await;
        let result = handler.execute(&c, &c.step_definition.config).await;
        assert!(matches!(result, StepResult::Fail { error_code: ErrorCode::ApprovalTimeout, .. }));
    }
}

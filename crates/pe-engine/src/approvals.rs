//! The approval-decision operation: records
//! the decision on the `ApprovalStore` and resumes the paused execution.

use crate::engine::ExecutionEngine;
use crate::error::{EngineError, EngineResult};
use pe_domain::{ApprovalId, ApprovalRequest};
use pe_events::ProcessEvent;
use pe_store::ApprovalStore;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDecision {
    Approve,
    Reject,
}

pub struct ApprovalService {
    approvals: Arc<dyn ApprovalStore>,
    engine: ExecutionEngine,
}

impl ApprovalService {
    pub fn new(approvals: Arc<dyn ApprovalStore>, engine: ExecutionEngine) -> Self {
        Self { approvals, engine }
    }

    /// Lists approvals still awaiting a decision, optionally narrowed to
    /// those a given user is an assignee of (or unassigned, open to anyone).
    pub async fn list_pending(&self, user: Option<&str>) -> EngineResult<Vec<ApprovalRequest>> {
        Ok(self.approvals.list_pending_for(user).await?)
    }

    /// Records `decision` against `approval_id` and resumes the owning
    /// execution. Rejects an already-decided approval or an actor outside
    /// the assignee list.
    pub async fn decide(
        &self,
        approval_id: ApprovalId,
        decision: ApprovalDecision,
        actor: &str,
        comment: Option<String>,
    ) -> EngineResult<ApprovalRequest> {
        let mut approval = self.approvals.get(approval_id).await?;
        if approval.status.is_terminal() {
            return Err(EngineError::StateForbidden(format!("approval {approval_id} has already been decided")));
        }
        if !approval.is_assignee(actor) {
            return Err(EngineError::Unauthorized(format!(
                "'{actor}' is not an assignee of approval {approval_id}"
            )));
        }

        match decision {
            ApprovalDecision::Approve => approval.approve(actor, comment),
            ApprovalDecision::Reject => approval.reject(actor, comment),
        }
        self.approvals.save(approval.clone()).await?;

        self.engine.bus().publish(
            approval.execution_id,
            ProcessEvent::ApprovalDecided {
                approval_id,
                approved: decision == ApprovalDecision::Approve,
                decided_by: actor.to_string(),
            },
        );

        self.engine.resume(approval.execution_id).await?;
        Ok(approval)
    }
}

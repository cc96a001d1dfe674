//! The `ApprovalRequest` entity, owned by its own store.

use crate::ids::{ApprovalId, ExecutionId, StepId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

impl ApprovalStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ApprovalStatus::Pending)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: ApprovalId,
    pub execution_id: ExecutionId,
    pub step_id: StepId,
    pub title: String,
    pub description: Option<String>,
    pub assignees: Vec<String>,
    pub status: ApprovalStatus,
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decided_by: Option<String>,
    pub decision_comment: Option<String>,
}

impl ApprovalRequest {
    pub fn new(
        execution_id: ExecutionId,
        step_id: StepId,
        title: impl Into<String>,
        description: Option<String>,
        assignees: Vec<String>,
        deadline: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: ApprovalId::new(),
            execution_id,
            step_id,
            title: title.into(),
            description,
            assignees,
            status: ApprovalStatus::Pending,
            deadline,
            created_at: Utc::now(),
            decided_at: None,
            decided_by: None,
            decision_comment: None,
        }
    }

    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }

    pub fn approve(&mut self, decided_by: impl Into<String>, comment: Option<String>) {
        self.status = ApprovalStatus::Approved;
        self.decided_at = Some(Utc::now());
        self.decided_by = Some(decided_by.into());
        self.decision_comment = comment;
    }

    pub fn reject(&mut self, decided_by: impl Into<String>, comment: Option<String>) {
        self.status = ApprovalStatus::Rejected;
        self.decided_at = Some(Utc::now());
        self.decided_by = Some(decided_by.into());
        self.decision_comment = comment;
    }

    pub fn expire(&mut self) {
        self.status = ApprovalStatus::Expired;
        self.decided_at = Some(Utc::now());
    }

    /// Anyone is authorized when the assignee list is empty.
    pub fn is_assignee(&self, user: &str) -> bool {
        self.assignees.is_empty() || self.assignees.iter().any(|a| a == user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_request() -> ApprovalRequest {
        ApprovalRequest::new(
            ExecutionId::new(),
            StepId::from("approve"),
            "Approve the thing",
            None,
            vec![],
            None,
        )
    }

    #[test]
    fn empty_assignees_means_anyone_authorized() {
        let req = new_request();
        assert!(req.is_assignee("anyone"));
    }

    #[test]
    fn non_empty_assignees_restricts_authorization() {
        let mut req = new_request();
        req.assignees = vec!["alice".into()];
        assert!(req.is_assignee("alice"));
        assert!(!req.is_assignee("bob"));
    }

    #[test]
    fn approve_sets_terminal_state() {
        let mut req = new_request();
        req.approve("alice", Some("looks good".into()));
        assert_eq!(req.status, ApprovalStatus::Approved);
        assert!(req.status.is_terminal());
        assert_eq!(req.decided_by.as_deref(), Some("alice"));
    }

    #[test]
    fn past_deadline_detection() {
        let mut req = new_request();
        let now = Utc::now();
        req.deadline = Some(now - chrono::Duration::seconds(1));
        assert!(req.is_past_deadline(now));

        req.deadline = Some(now + chrono::Duration::seconds(60));
        assert!(!req.is_past_deadline(now));
    }
}

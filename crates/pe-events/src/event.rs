//! The process-event taxonomy.

use chrono::{DateTime, Utc};
use pe_domain::{ApprovalId, ErrorCode, ExecutionId, StepId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Discriminant used for typed subscription (`EventBus::subscribe`). One
/// variant per `ProcessEvent` case, carrying no payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ProcessStarted,
    ProcessCompleted,
    ProcessFailed,
    ProcessCancelled,
    StepStarted,
    StepCompleted,
    StepFailed,
    StepRetrying,
    StepSkipped,
    StepWaitingApproval,
    ApprovalRequested,
    ApprovalDecided,
    CompensationStarted,
    CompensationCompleted,
    CompensationFailed,
    InformedNotification,
}

/// A domain event raised by the execution engine. Every variant carries the
/// fields an observer needs without a round-trip to the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum ProcessEvent {
    ProcessStarted { process_name: String, process_version: String },
    ProcessCompleted { output: Value },
    ProcessFailed { error: String, failed_step_id: Option<StepId> },
    ProcessCancelled { reason: String },
    StepStarted { step_id: StepId },
    StepCompleted { step_id: StepId, output: Value },
    StepFailed { step_id: StepId, error: String, error_code: ErrorCode },
    StepRetrying { step_id: StepId, attempt: u32, next_delay: Duration },
    StepSkipped { step_id: StepId, reason: String },
    /// `approval_id` is `None` when the wait did not originate from a
    /// `human_approval` step (e.g. a `sub_process` step awaiting a paused
    /// child execution).
    StepWaitingApproval { step_id: StepId, approval_id: Option<ApprovalId> },
    ApprovalRequested { approval_id: ApprovalId, step_id: StepId },
    ApprovalDecided { approval_id: ApprovalId, approved: bool, decided_by: String },
    CompensationStarted { count: usize },
    CompensationCompleted { step_id: StepId },
    CompensationFailed { step_id: StepId, error: String },
    InformedNotification { step_id: StepId, message: String },
}

impl ProcessEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            ProcessEvent::ProcessStarted { .. } => EventType::ProcessStarted,
            ProcessEvent::ProcessCompleted { .. } => EventType::ProcessCompleted,
            ProcessEvent::ProcessFailed { .. } => EventType::ProcessFailed,
            ProcessEvent::ProcessCancelled { .. } => EventType::ProcessCancelled,
            ProcessEvent::StepStarted { .. } => EventType::StepStarted,
            ProcessEvent::StepCompleted { .. } => EventType::StepCompleted,
            ProcessEvent::StepFailed { .. } => EventType::StepFailed,
            ProcessEvent::StepRetrying { .. } => EventType::StepRetrying,
            ProcessEvent::StepSkipped { .. } => EventType::StepSkipped,
            ProcessEvent::StepWaitingApproval { .. } => EventType::StepWaitingApproval,
            ProcessEvent::ApprovalRequested { .. } => EventType::ApprovalRequested,
            ProcessEvent::ApprovalDecided { .. } => EventType::ApprovalDecided,
            ProcessEvent::CompensationStarted { .. } => EventType::CompensationStarted,
            ProcessEvent::CompensationCompleted { .. } => EventType::CompensationCompleted,
            ProcessEvent::CompensationFailed { .. } => EventType::CompensationFailed,
            ProcessEvent::InformedNotification { .. } => EventType::InformedNotification,
        }
    }
}

/// What actually travels through the bus: an event plus the execution it
/// belongs to and when it was raised.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub execution_id: ExecutionId,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: ProcessEvent,
}

impl EventEnvelope {
    pub fn new(execution_id: ExecutionId, event: ProcessEvent) -> Self {
        Self { execution_id, timestamp: Utc::now(), event }
    }

    pub fn event_type(&self) -> EventType {
        self.event.event_type()
    }
}

//! The `ProcessDefinition` aggregate and its `StepDefinition` entities.

use crate::error::DomainError;
use crate::ids::{DefinitionId, StepId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Duration;

/// Semantic `major.minor` version of a process definition lineage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl Version {
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    pub fn initial() -> Self {
        Self::new(1, 0)
    }

    /// The version assigned to a cloned draft created via `create_new_version`.
    pub fn bump_minor(self) -> Self {
        Self::new(self.major, self.minor + 1)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionStatus {
    Draft,
    Published,
    Archived,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    Manual,
    Webhook {
        id: String,
    },
    Schedule {
        cron: String,
        timezone: String,
        description: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub name: String,
    pub source: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    AgentTask,
    HumanApproval,
    Gateway,
    Timer,
    Notification,
    SubProcess,
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StepType::AgentTask => "agent_task",
            StepType::HumanApproval => "human_approval",
            StepType::Gateway => "gateway",
            StepType::Timer => "timer",
            StepType::Notification => "notification",
            StepType::SubProcess => "sub_process",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayType {
    Exclusive,
    Parallel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayRoute {
    pub condition: String,
    pub target: StepId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Slack,
    Email,
    Webhook,
}

/// Type-specific, sum-typed step configuration. The validator
/// is the only place raw documents get parsed into this type; handlers accept
/// only the matching variant and return `INVALID_CONFIG` otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepConfig {
    AgentTask {
        agent: String,
        message: String,
        model: Option<String>,
        temperature_millis: Option<i64>,
        timeout: Option<Duration>,
    },
    HumanApproval {
        title: Option<String>,
        description: Option<String>,
        assignees: Vec<String>,
        timeout: Duration,
    },
    Gateway {
        routes: Vec<GatewayRoute>,
        gateway_type: GatewayType,
        default_route: Option<StepId>,
    },
    Timer {
        duration: Option<Duration>,
        until: Option<DateTime<Utc>>,
    },
    Notification {
        channel: NotificationChannel,
        message: String,
        subject: Option<String>,
        recipients: Vec<String>,
        webhook_url: Option<String>,
    },
    SubProcess {
        process_name: String,
        version: Option<String>,
        input_mapping: HashMap<String, String>,
        output_key: String,
        wait_for_completion: bool,
        timeout: Duration,
    },
}

impl StepConfig {
    pub fn step_type(&self) -> StepType {
        match self {
            StepConfig::AgentTask { .. } => StepType::AgentTask,
            StepConfig::HumanApproval { .. } => StepType::HumanApproval,
            StepConfig::Gateway { .. } => StepType::Gateway,
            StepConfig::Timer { .. } => StepType::Timer,
            StepConfig::Notification { .. } => StepType::Notification,
            StepConfig::SubProcess { .. } => StepType::SubProcess,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub backoff_multiplier_millis: u32,
}

impl RetryPolicy {
    /// `backoff_multiplier` is expressed as thousandths to keep the struct
    /// `Eq` (plain `f64` is not); `1000` means a multiplier of `1.0`.
    pub fn backoff_multiplier(&self) -> f64 {
        self.backoff_multiplier_millis as f64 / 1000.0
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return self.initial_delay;
        }
        let factor = self.backoff_multiplier().powi((attempt - 1) as i32);
        Duration::from_secs_f64(self.initial_delay.as_secs_f64() * factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::from_secs(0),
            backoff_multiplier_millis: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ErrorAction {
    FailProcess,
    SkipStep,
    GotoStep { target_step: StepId },
}

impl Default for ErrorAction {
    fn default() -> Self {
        ErrorAction::FailProcess
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPolicy {
    pub action: ErrorAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compensation {
    pub config: StepConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roles {
    pub executor: Option<String>,
    pub monitors: Vec<String>,
    pub informed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub id: StepId,
    pub name: Option<String>,
    pub config: StepConfig,
    pub dependencies: HashSet<StepId>,
    pub condition: Option<String>,
    pub retry_policy: RetryPolicy,
    pub error_policy: ErrorPolicy,
    pub compensation: Option<Compensation>,
    pub roles: Option<Roles>,
    pub timeout: Option<Duration>,
}

impl StepDefinition {
    pub fn step_type(&self) -> StepType {
        self.config.step_type()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessDefinition {
    pub id: DefinitionId,
    pub name: String,
    pub description: Option<String>,
    pub version: Version,
    pub status: DefinitionStatus,
    pub steps: Vec<StepDefinition>,
    pub outputs: Vec<Output>,
    pub triggers: Vec<Trigger>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProcessDefinition {
    pub fn step(&self, id: &StepId) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| &s.id == id)
    }

    pub fn is_draft(&self) -> bool {
        self.status == DefinitionStatus::Draft
    }

    /// `update`: allowed only while the definition is a draft.
    pub fn ensure_mutable(&self) -> Result<(), DomainError> {
        if self.is_draft() {
            Ok(())
        } else {
            Err(DomainError::StateForbidden(format!(
                "definition '{}' v{} is {:?}, only draft definitions can be updated",
                self.name, self.version, self.status
            )))
        }
    }

    /// `publish` (draft -> published). Callers run full semantic validation
    /// before invoking this; this method only enforces the lifecycle
    /// invariant and freezes the aggregate.
    pub fn publish(&mut self) -> Result<(), DomainError> {
        if self.status != DefinitionStatus::Draft {
            return Err(DomainError::StateForbidden(format!(
                "cannot publish a definition in status {:?}",
                self.status
            )));
        }
        self.status = DefinitionStatus::Published;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// `archive` (published -> archived).
    pub fn archive(&mut self) -> Result<(), DomainError> {
        if self.status != DefinitionStatus::Published {
            return Err(DomainError::StateForbidden(format!(
                "cannot archive a definition in status {:?}",
                self.status
            )));
        }
        self.status = DefinitionStatus::Archived;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// `create_new_version`: clone this definition into a fresh draft with a
    /// new id and a bumped minor version, forming the next entry in the
    /// `(name, version)` lineage.
    pub fn create_new_version(&self, created_by: impl Into<String>) -> ProcessDefinition {
        let now = Utc::now();
        ProcessDefinition {
            id: DefinitionId::new(),
            name: self.name.clone(),
            description: self.description.clone(),
            version: self.version.bump_minor(),
            status: DefinitionStatus::Draft,
            steps: self.steps.clone(),
            outputs: self.outputs.clone(),
            triggers: self.triggers.clone(),
            created_by: created_by.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

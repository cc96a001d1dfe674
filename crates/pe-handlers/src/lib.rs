//! Step handlers: the uniform `StepHandler` contract, the shared
//! expression/condition evaluators, and one implementation per `StepType`.

pub mod agent_gateway;
pub mod agent_task;
pub mod circuit_breaker;
pub mod context;
pub mod expr;
pub mod human_approval;
pub mod notification;
pub mod notifier;
pub mod registry;
pub mod step_gateway;
pub mod sub_process;
pub mod timer;

pub use agent_gateway::{AgentGateway, AgentGatewayError, AgentResponse};
pub use agent_task::AgentTaskHandler;
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerMetrics, CircuitState};
pub use context::{StepContext, StepHandler, StepResult};
pub use expr::{ConditionEvaluator, ExpressionEvaluator};
pub use human_approval::HumanApprovalHandler;
pub use notification::NotificationHandler;
pub use notifier::{informed_context, ChannelAdapter, NoopNotifier, Notifier};
pub use registry::HandlerRegistry;
pub use step_gateway::GatewayHandler;
pub use sub_process::{ChildOutcome, ProcessRunner, ProcessRunnerError, SubProcessHandler};
pub use timer::TimerHandler;

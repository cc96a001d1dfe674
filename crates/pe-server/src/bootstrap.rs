//! Assembles the explicit `EngineContext` the transport layer is threaded
//! through. There is no process-wide state here besides logging — every
//! collaborator is constructed fresh and handed down.

use crate::config::ServerConfig;
use crate::runner::EngineHandle;
use crate::sse::SseBroadcaster;
use pe_engine::{ApprovalService, DefinitionService, ExecutionEngine};
use pe_events::{EventBus, LiveStreamPublisher, WebhookPublisher};
use pe_handlers::{
    AgentGateway, AgentTaskHandler, ChannelAdapter, GatewayHandler, HandlerRegistry,
    HumanApprovalHandler, NotificationHandler, SubProcessHandler, TimerHandler,
};
use pe_store::{ApprovalStore, DefinitionStore, ExecutionStore, InMemoryApprovalStore, InMemoryDefinitionStore, InMemoryExecutionStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// The handle every axum route is built against. Cheap to clone: every field
/// is already `Arc`- or otherwise reference-counted.
#[derive(Clone)]
pub struct EngineContext {
    pub definitions: Arc<DefinitionService>,
    pub engine: ExecutionEngine,
    pub approvals: Arc<ApprovalService>,
    pub bus: Arc<EventBus>,
    pub sse: SseBroadcaster,
}

/// Collaborators that live outside this crate: the agent runtime and any
/// notification channel adapters to wire into the `notification` step type.
/// Hosts that have a real `AgentGateway` implementation pass it here;
/// `pe-server` ships only the in-process pieces the core engine owns.
pub struct Collaborators {
    pub agent_gateway: Arc<dyn AgentGateway>,
    pub channel_adapters: HashMap<&'static str, Arc<dyn ChannelAdapter>>,
}

pub fn bootstrap(config: &ServerConfig, collaborators: Collaborators) -> EngineContext {
    let definitions_store: Arc<dyn DefinitionStore> = Arc::new(InMemoryDefinitionStore::new());
    let executions_store: Arc<dyn ExecutionStore> = Arc::new(InMemoryExecutionStore::new());
    let approvals_store: Arc<dyn ApprovalStore> = Arc::new(InMemoryApprovalStore::new());

    let bus = Arc::new(EventBus::new());
    let sse = SseBroadcaster::new(1024);
    bus.subscribe_all(Arc::new(LiveStreamPublisher::new(sse.clone())));
    if !config.webhook.urls.is_empty() {
        bus.subscribe_all(Arc::new(WebhookPublisher::new(config.webhook.to_webhook_config())));
    }

    // `SubProcessHandler` needs a `ProcessRunner` before the `ExecutionEngine`
    // it will recurse into exists; `EngineHandle` is filled in below once the
    // engine is built.
    let runner = Arc::new(EngineHandle::new());

    let mut registry = HandlerRegistry::new();
    registry
        .register(Arc::new(AgentTaskHandler::new(collaborators.agent_gateway)))
        .register(Arc::new(HumanApprovalHandler::new(approvals_store.clone())))
        .register(Arc::new(GatewayHandler::new()))
        .register(Arc::new(TimerHandler::new(CancellationToken::new())))
        .register(Arc::new(NotificationHandler::new(collaborators.channel_adapters)))
        .register(Arc::new(SubProcessHandler::new(runner.clone())));

    let engine = ExecutionEngine::new(
        definitions_store.clone(),
        executions_store.clone(),
        approvals_store.clone(),
        registry,
        bus.clone(),
        config.engine.to_engine_config(),
    );
    runner.set(engine.clone());

    let definitions = Arc::new(DefinitionService::new(definitions_store));
    let approvals = Arc::new(ApprovalService::new(approvals_store, engine.clone()));

    EngineContext {
        definitions,
        engine,
        approvals,
        bus,
        sse,
    }
}

//! Process Engine HTTP server.
//!
//! Assembles an `EngineContext` from configuration and the stub
//! collaborators this crate ships (an agent gateway that reports every
//! agent unavailable, no notification channels), then serves the axum
//! router built by `pe_server::app`. A deployment with a real agent
//! runtime or notification side channels links against `pe-server` as a
//! library and calls `bootstrap` with its own `Collaborators` instead of
//! running this binary directly.

use pe_server::bootstrap::{bootstrap, Collaborators};
use pe_server::collaborators::UnavailableAgentGateway;
use std::collections::HashMap;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pe_server=info".parse()?))
        .init();

    let config = pe_server::config::load()?;
    let addr = format!("{}:{}", config.server.bind_address, config.server.bind_port);

    let ctx = bootstrap(
        &config,
        Collaborators {
            agent_gateway: Arc::new(UnavailableAgentGateway),
            channel_adapters: HashMap::new(),
        },
    );

    tracing::info!(%addr, "process engine starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, pe_server::app(ctx)).await?;
    Ok(())
}

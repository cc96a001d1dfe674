//! Thin HTTP transport over the process engine: request parsing, status-code
//! mapping, and SSE fan-out. All domain logic lives in `pe-engine` and below;
//! this crate only translates between the wire and `EngineContext`.

pub mod bootstrap;
pub mod collaborators;
pub mod config;
pub mod dto;
pub mod error;
pub mod routes;
pub mod runner;
pub mod sse;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use bootstrap::EngineContext;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Builds the full router: health check, the process-engine routes, and the
/// cross-cutting middleware stack (tracing, CORS, request timeout).
pub fn app(ctx: EngineContext) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .merge(routes::router())
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

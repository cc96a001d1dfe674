pub mod approvals;
pub mod definitions;
pub mod events;
pub mod executions;

use crate::bootstrap::EngineContext;
use axum::Router;

pub fn router() -> Router<EngineContext> {
    Router::new()
        .merge(definitions::router())
        .merge(executions::router())
        .merge(approvals::router())
        .merge(events::router())
}

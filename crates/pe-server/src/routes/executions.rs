//! Execution routes: start, get, list, cancel, retry.

use crate::bootstrap::EngineContext;
use crate::dto::{CancelExecutionRequest, ListExecutionsQuery, StartExecutionRequest};
use crate::error::ApiError;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use pe_domain::{DefinitionId, ExecutionId};
use serde_json::json;

pub fn router() -> Router<EngineContext> {
    Router::new()
        .route("/executions", post(start).get(list))
        .route("/executions/{id}", get(get_one))
        .route("/executions/{id}/cancel", post(cancel))
        .route("/executions/{id}/retry", post(retry))
}

async fn start(
    State(ctx): State<EngineContext>,
    Json(body): Json<StartExecutionRequest>,
) -> Result<(StatusCode, Json<pe_domain::ProcessExecution>), ApiError> {
    let definition_id = DefinitionId::from(body.definition_id);
    let execution = ctx
        .engine
        .start_by_definition_id(definition_id, body.input, body.triggered_by.into())
        .await?;
    Ok((StatusCode::CREATED, Json(execution)))
}

async fn get_one(
    State(ctx): State<EngineContext>,
    Path(id): Path<ExecutionId>,
) -> Result<Json<pe_domain::ProcessExecution>, ApiError> {
    Ok(Json(ctx.engine.executions().get_by_id(id).await.map_err(pe_engine::EngineError::from)?))
}

async fn list(
    State(ctx): State<EngineContext>,
    Query(query): Query<ListExecutionsQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let limit = query.limit.unwrap_or(50);
    let offset = query.offset.unwrap_or(0);

    if let Some(parent_id) = query.parent_execution_id {
        let executions = ctx
            .engine
            .executions()
            .list_by_parent(ExecutionId::from(parent_id))
            .await
            .map_err(pe_engine::EngineError::from)?;
        let total = executions.len();
        return Ok(Json(json!({ "items": executions, "total": total, "limit": limit, "offset": offset })));
    }

    let status = query.status().map_err(ApiError::BadRequest)?;
    let process_id = query.process_id.map(DefinitionId::from);
    let executions = ctx
        .engine
        .executions()
        .list(status, process_id, limit, offset)
        .await
        .map_err(pe_engine::EngineError::from)?;

    Ok(Json(json!({ "items": executions, "total": executions.len(), "limit": limit, "offset": offset })))
}

async fn cancel(
    State(ctx): State<EngineContext>,
    Path(id): Path<ExecutionId>,
    Json(body): Json<CancelExecutionRequest>,
) -> Result<Json<pe_domain::ProcessExecution>, ApiError> {
    Ok(Json(ctx.engine.cancel(id, body.reason).await?))
}

async fn retry(
    State(ctx): State<EngineContext>,
    Path(id): Path<ExecutionId>,
) -> Result<(StatusCode, Json<pe_domain::ProcessExecution>), ApiError> {
    let execution = ctx.engine.retry(id).await?;
    Ok((StatusCode::CREATED, Json(execution)))
}

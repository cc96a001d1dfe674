//! Definition lifecycle routes: create, update, publish, archive,
//! create-new-version, list, get.

use crate::bootstrap::EngineContext;
use crate::dto::{CreateDefinitionRequest, GetDefinitionByNameQuery, ListDefinitionsQuery, UpdateDefinitionRequest};
use crate::error::ApiError;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use pe_domain::DefinitionId;
use serde_json::json;

pub fn router() -> Router<EngineContext> {
    Router::new()
        .route("/definitions", post(create).get(list))
        .route("/definitions/by-name/{name}", get(get_by_name))
        .route("/definitions/{id}", get(get_one).put(update))
        .route("/definitions/{id}/publish", post(publish))
        .route("/definitions/{id}/archive", post(archive))
        .route("/definitions/{id}/versions", post(new_version))
}

async fn create(
    State(ctx): State<EngineContext>,
    Json(body): Json<CreateDefinitionRequest>,
) -> Result<(StatusCode, Json<pe_domain::ProcessDefinition>), ApiError> {
    let definition = ctx.definitions.create(&body.document, &body.created_by).await?;
    Ok((StatusCode::CREATED, Json(definition)))
}

async fn update(
    State(ctx): State<EngineContext>,
    Path(id): Path<DefinitionId>,
    Json(body): Json<UpdateDefinitionRequest>,
) -> Result<Json<pe_domain::ProcessDefinition>, ApiError> {
    let definition = ctx.definitions.update(id, &body.document).await?;
    Ok(Json(definition))
}

async fn publish(
    State(ctx): State<EngineContext>,
    Path(id): Path<DefinitionId>,
) -> Result<Json<pe_domain::ProcessDefinition>, ApiError> {
    Ok(Json(ctx.definitions.publish(id).await?))
}

async fn archive(
    State(ctx): State<EngineContext>,
    Path(id): Path<DefinitionId>,
) -> Result<Json<pe_domain::ProcessDefinition>, ApiError> {
    Ok(Json(ctx.definitions.archive(id).await?))
}

#[derive(serde::Deserialize)]
struct NewVersionRequest {
    created_by: String,
}

async fn new_version(
    State(ctx): State<EngineContext>,
    Path(id): Path<DefinitionId>,
    Json(body): Json<NewVersionRequest>,
) -> Result<(StatusCode, Json<pe_domain::ProcessDefinition>), ApiError> {
    let definition = ctx.definitions.create_new_version(id, &body.created_by).await?;
    Ok((StatusCode::CREATED, Json(definition)))
}

async fn get_one(
    State(ctx): State<EngineContext>,
    Path(id): Path<DefinitionId>,
) -> Result<Json<pe_domain::ProcessDefinition>, ApiError> {
    Ok(Json(ctx.definitions.get(id).await?))
}

async fn get_by_name(
    State(ctx): State<EngineContext>,
    Path(name): Path<String>,
    Query(query): Query<GetDefinitionByNameQuery>,
) -> Result<Json<pe_domain::ProcessDefinition>, ApiError> {
    let version = query.version().map_err(ApiError::BadRequest)?;
    Ok(Json(ctx.definitions.get_by_name(&name, version).await?))
}

async fn list(
    State(ctx): State<EngineContext>,
    Query(query): Query<ListDefinitionsQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let status = query.status().map_err(ApiError::BadRequest)?;
    let limit = query.limit.unwrap_or(50);
    let offset = query.offset.unwrap_or(0);

    let definitions = ctx.definitions.list(status, limit, offset).await?;
    let total = ctx.definitions.count(status).await?;

    Ok(Json(json!({ "items": definitions, "total": total, "limit": limit, "offset": offset })))
}

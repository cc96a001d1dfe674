//! Human approval routes: list pending decisions, record a decision.

use crate::bootstrap::EngineContext;
use crate::dto::{parse_approval_id, DecideApprovalRequest, DecisionDto, ListPendingApprovalsQuery};
use crate::error::ApiError;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use pe_engine::ApprovalDecision;

pub fn router() -> Router<EngineContext> {
    Router::new()
        .route("/approvals", get(list_pending))
        .route("/approvals/{id}/decide", post(decide))
}

async fn list_pending(
    State(ctx): State<EngineContext>,
    Query(query): Query<ListPendingApprovalsQuery>,
) -> Result<Json<Vec<pe_domain::ApprovalRequest>>, ApiError> {
    let pending = ctx.approvals.list_pending(query.user.as_deref()).await?;
    Ok(Json(pending))
}

async fn decide(
    State(ctx): State<EngineContext>,
    Path(id): Path<String>,
    Json(body): Json<DecideApprovalRequest>,
) -> Result<Json<pe_domain::ApprovalRequest>, ApiError> {
    let approval_id = parse_approval_id(&id).map_err(ApiError::BadRequest)?;
    let decision = match body.decision {
        DecisionDto::Approve => ApprovalDecision::Approve,
        DecisionDto::Reject => ApprovalDecision::Reject,
    };
    let approval = ctx.approvals.decide(approval_id, decision, &body.actor, body.comment).await?;
    Ok(Json(approval))
}

use axum::extract::State;
use axum::response::Response;
use contracts::domain::a006_pipeline_stage::aggregate::{
    PipelineStageDto, PipelineStageId, PipelineStagePatch, ReorderStagesRequest, StageListQuery,
};
use serde_json::json;

use crate::domain::a006_pipeline_stage::service;
use crate::shared::api::{ApiJson, ApiPath, ApiQuery, RequestContext};
use crate::shared::state::AppState;
use crate::system::auth::CurrentUser;

/// GET /api/pipeline-stages
pub async fn list(
    State(state): State<AppState>,
    rc: RequestContext,
    ApiQuery(query): ApiQuery<StageListQuery>,
) -> Response {
    rc.ok(service::list(&state.db, query.is_active).await)
}

/// GET /api/pipeline-stages/:id
pub async fn get_by_id(
    State(state): State<AppState>,
    rc: RequestContext,
    ApiPath(id): ApiPath<PipelineStageId>,
) -> Response {
    rc.ok(service::get(&state.db, id).await)
}

/// POST /api/pipeline-stages
pub async fn create(
    State(state): State<AppState>,
    rc: RequestContext,
    user: CurrentUser,
    ApiJson(dto): ApiJson<PipelineStageDto>,
) -> Response {
    let ctx = state.service_context(user.id);
    rc.created(service::create(&state.db, &ctx, dto).await)
}

/// PUT /api/pipeline-stages/:id
pub async fn update(
    State(state): State<AppState>,
    rc: RequestContext,
    user: CurrentUser,
    ApiPath(id): ApiPath<PipelineStageId>,
    ApiJson(patch): ApiJson<PipelineStagePatch>,
) -> Response {
    let ctx = state.service_context(user.id);
    rc.ok(service::update(&state.db, &ctx, id, patch).await)
}

/// DELETE /api/pipeline-stages/:id
pub async fn delete(
    State(state): State<AppState>,
    rc: RequestContext,
    user: CurrentUser,
    ApiPath(id): ApiPath<PipelineStageId>,
) -> Response {
    let ctx = state.service_context(user.id);
    let result = service::delete(&state.db, &ctx, id).await;
    rc.ok(result.map(|_| json!({ "id": id, "deleted": true })))
}

/// POST /api/pipeline-stages/reorder
pub async fn reorder(
    State(state): State<AppState>,
    rc: RequestContext,
    user: CurrentUser,
    ApiJson(req): ApiJson<ReorderStagesRequest>,
) -> Response {
    let ctx = state.service_context(user.id);
    rc.ok(service::reorder(&state.db, &ctx, req).await)
}

use axum::extract::State;
use axum::response::Response;
use contracts::domain::a007_deal::aggregate::{
    DealDto, DealId, DealListQuery, DealPatch, MoveDealRequest,
};
use contracts::shared::api::PageRequest;
use contracts::shared::error_codes::FIELD_REQUIRED;
use serde_json::json;

use crate::domain::a007_deal::service;
use crate::shared::api::{ApiJson, ApiPath, ApiQuery, RequestContext};
use crate::shared::error::ServiceError;
use crate::shared::state::AppState;
use crate::system::auth::CurrentUser;

/// GET /api/deals
pub async fn list(
    State(state): State<AppState>,
    rc: RequestContext,
    ApiQuery(query): ApiQuery<DealListQuery>,
) -> Response {
    let page = PageRequest::from_params(query.page, query.per_page);
    rc.page(page, service::list(&state.db, &query, page).await)
}

/// GET /api/deals/:id
pub async fn get_by_id(
    State(state): State<AppState>,
    rc: RequestContext,
    ApiPath(id): ApiPath<DealId>,
) -> Response {
    rc.ok(service::get(&state.db, id).await)
}

/// POST /api/deals
pub async fn create(
    State(state): State<AppState>,
    rc: RequestContext,
    user: CurrentUser,
    ApiJson(dto): ApiJson<DealDto>,
) -> Response {
    let ctx = state.service_context(user.id);
    rc.created(service::create(&state.db, &ctx, dto).await)
}

/// PUT /api/deals/:id
pub async fn update(
    State(state): State<AppState>,
    rc: RequestContext,
    user: CurrentUser,
    ApiPath(id): ApiPath<DealId>,
    ApiJson(patch): ApiJson<DealPatch>,
) -> Response {
    let ctx = state.service_context(user.id);
    rc.ok(service::update(&state.db, &ctx, id, patch).await)
}

/// DELETE /api/deals/:id
pub async fn delete(
    State(state): State<AppState>,
    rc: RequestContext,
    user: CurrentUser,
    ApiPath(id): ApiPath<DealId>,
) -> Response {
    let ctx = state.service_context(user.id);
    let result = service::delete(&state.db, &ctx, id).await;
    rc.ok(result.map(|_| json!({ "id": id, "deleted": true })))
}

/// POST /api/deals/:id/move
pub async fn move_deal(
    State(state): State<AppState>,
    rc: RequestContext,
    user: CurrentUser,
    ApiPath(id): ApiPath<DealId>,
    ApiJson(req): ApiJson<MoveDealRequest>,
) -> Response {
    let Some(stage_id) = req.stage_id else {
        return rc.error(ServiceError::field(
            "stage_id",
            FIELD_REQUIRED,
            "stage_id is required",
        ));
    };
    let ctx = state.service_context(user.id);
    rc.ok(service::move_deal(&state.db, &ctx, id, stage_id).await)
}

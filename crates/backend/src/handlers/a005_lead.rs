use axum::extract::State;
use axum::response::Response;
use contracts::domain::a005_lead::aggregate::{
    ConvertLeadRequest, CreateAccountFromLeadRequest, LeadDto, LeadId, LeadListQuery, LeadPatch,
};
use contracts::shared::api::PageRequest;
use serde_json::json;

use crate::domain::a005_lead::service;
use crate::shared::api::{ApiJson, ApiPath, ApiQuery, RequestContext};
use crate::shared::state::AppState;
use crate::system::auth::CurrentUser;

/// GET /api/leads
pub async fn list(
    State(state): State<AppState>,
    rc: RequestContext,
    ApiQuery(query): ApiQuery<LeadListQuery>,
) -> Response {
    let page = PageRequest::from_params(query.page, query.per_page);
    rc.page(page, service::list(&state.db, &query, page).await)
}

/// GET /api/leads/:id
pub async fn get_by_id(
    State(state): State<AppState>,
    rc: RequestContext,
    ApiPath(id): ApiPath<LeadId>,
) -> Response {
    rc.ok(service::get(&state.db, id).await)
}

/// POST /api/leads
pub async fn create(
    State(state): State<AppState>,
    rc: RequestContext,
    user: CurrentUser,
    ApiJson(dto): ApiJson<LeadDto>,
) -> Response {
    let ctx = state.service_context(user.id);
    rc.created(service::create(&state.db, &ctx, dto).await)
}

/// PUT /api/leads/:id
pub async fn update(
    State(state): State<AppState>,
    rc: RequestContext,
    user: CurrentUser,
    ApiPath(id): ApiPath<LeadId>,
    ApiJson(patch): ApiJson<LeadPatch>,
) -> Response {
    let ctx = state.service_context(user.id);
    rc.ok(service::update(&state.db, &ctx, id, patch).await)
}

/// DELETE /api/leads/:id
pub async fn delete(
    State(state): State<AppState>,
    rc: RequestContext,
    user: CurrentUser,
    ApiPath(id): ApiPath<LeadId>,
) -> Response {
    let ctx = state.service_context(user.id);
    let result = service::delete(&state.db, &ctx, id).await;
    rc.ok(result.map(|_| json!({ "id": id, "deleted": true })))
}

/// POST /api/leads/:id/convert
pub async fn convert(
    State(state): State<AppState>,
    rc: RequestContext,
    user: CurrentUser,
    ApiPath(id): ApiPath<LeadId>,
    ApiJson(req): ApiJson<ConvertLeadRequest>,
) -> Response {
    let ctx = state.service_context(user.id);
    rc.created(service::convert(&state.db, &ctx, id, req).await)
}

/// POST /api/leads/:id/create-account
pub async fn create_account(
    State(state): State<AppState>,
    rc: RequestContext,
    user: CurrentUser,
    ApiPath(id): ApiPath<LeadId>,
    ApiJson(req): ApiJson<CreateAccountFromLeadRequest>,
) -> Response {
    let ctx = state.service_context(user.id);
    rc.ok(service::create_account_from_lead(&state.db, &ctx, id, req).await)
}

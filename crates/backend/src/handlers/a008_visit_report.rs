use axum::extract::State;
use axum::response::Response;
use contracts::domain::a008_visit_report::aggregate::{
    RejectVisitRequest, VisitPhotoRequest, VisitReportDto, VisitReportId, VisitReportListQuery,
    VisitReportPatch,
};
use contracts::domain::common::GeoLocation;
use contracts::shared::api::PageRequest;

use crate::domain::a008_visit_report::service;
use crate::shared::api::{ApiJson, ApiPath, ApiQuery, RequestContext};
use crate::shared::state::AppState;
use crate::system::auth::CurrentUser;

/// GET /api/visit-reports
pub async fn list(
    State(state): State<AppState>,
    rc: RequestContext,
    ApiQuery(query): ApiQuery<VisitReportListQuery>,
) -> Response {
    let page = PageRequest::from_params(query.page, query.per_page);
    rc.page(page, service::list(&state.db, &query, page).await)
}

/// GET /api/visit-reports/:id
pub async fn get_by_id(
    State(state): State<AppState>,
    rc: RequestContext,
    ApiPath(id): ApiPath<VisitReportId>,
) -> Response {
    rc.ok(service::get(&state.db, id).await)
}

/// POST /api/visit-reports
pub async fn create(
    State(state): State<AppState>,
    rc: RequestContext,
    user: CurrentUser,
    ApiJson(dto): ApiJson<VisitReportDto>,
) -> Response {
    let ctx = state.service_context(user.id);
    rc.created(service::create(&state.db, &ctx, dto).await)
}

/// PUT /api/visit-reports/:id
pub async fn update(
    State(state): State<AppState>,
    rc: RequestContext,
    user: CurrentUser,
    ApiPath(id): ApiPath<VisitReportId>,
    ApiJson(patch): ApiJson<VisitReportPatch>,
) -> Response {
    let ctx = state.service_context(user.id);
    rc.ok(service::update(&state.db, &ctx, id, patch).await)
}

/// POST /api/visit-reports/:id/check-in
pub async fn check_in(
    State(state): State<AppState>,
    rc: RequestContext,
    user: CurrentUser,
    ApiPath(id): ApiPath<VisitReportId>,
    ApiJson(location): ApiJson<GeoLocation>,
) -> Response {
    let ctx = state.service_context(user.id);
    rc.ok(service::check_in(&state.db, &ctx, id, location).await)
}

/// POST /api/visit-reports/:id/check-out
pub async fn check_out(
    State(state): State<AppState>,
    rc: RequestContext,
    user: CurrentUser,
    ApiPath(id): ApiPath<VisitReportId>,
    ApiJson(location): ApiJson<GeoLocation>,
) -> Response {
    let ctx = state.service_context(user.id);
    rc.ok(service::check_out(&state.db, &ctx, id, location).await)
}

/// POST /api/visit-reports/:id/approve
pub async fn approve(
    State(state): State<AppState>,
    rc: RequestContext,
    user: CurrentUser,
    ApiPath(id): ApiPath<VisitReportId>,
) -> Response {
    let ctx = state.service_context(user.id);
    rc.ok(service::approve(&state.db, &ctx, id).await)
}

/// POST /api/visit-reports/:id/reject
pub async fn reject(
    State(state): State<AppState>,
    rc: RequestContext,
    user: CurrentUser,
    ApiPath(id): ApiPath<VisitReportId>,
    ApiJson(req): ApiJson<RejectVisitRequest>,
) -> Response {
    let ctx = state.service_context(user.id);
    rc.ok(service::reject(&state.db, &ctx, id, req).await)
}

/// POST /api/visit-reports/:id/photos
pub async fn upload_photo(
    State(state): State<AppState>,
    rc: RequestContext,
    user: CurrentUser,
    ApiPath(id): ApiPath<VisitReportId>,
    ApiJson(req): ApiJson<VisitPhotoRequest>,
) -> Response {
    let ctx = state.service_context(user.id);
    rc.ok(service::upload_photo(&state.db, &ctx, id, req).await)
}

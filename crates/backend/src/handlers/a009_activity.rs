use axum::extract::State;
use axum::response::Response;
use contracts::domain::a009_activity::aggregate::{ActivityDto, ActivityListQuery};
use contracts::shared::api::PageRequest;

use crate::domain::a009_activity::service;
use crate::shared::api::{ApiJson, ApiQuery, RequestContext};
use crate::shared::state::AppState;
use crate::system::auth::CurrentUser;

/// GET /api/activities
pub async fn list(
    State(state): State<AppState>,
    rc: RequestContext,
    ApiQuery(query): ApiQuery<ActivityListQuery>,
) -> Response {
    let page = PageRequest::from_params(query.page, query.per_page);
    rc.page(page, service::list(&state.db, &query, page).await)
}

/// POST /api/activities
pub async fn create(
    State(state): State<AppState>,
    rc: RequestContext,
    user: CurrentUser,
    ApiJson(dto): ApiJson<ActivityDto>,
) -> Response {
    let ctx = state.service_context(user.id);
    rc.created(service::create(&state.db, &ctx, dto).await)
}

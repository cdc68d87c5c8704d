use axum::extract::State;
use axum::response::Response;
use contracts::domain::a001_category::aggregate::{CategoryDto, CategoryListQuery};

use crate::domain::a001_category::service;
use crate::shared::api::{ApiJson, ApiQuery, RequestContext};
use crate::shared::state::AppState;
use crate::system::auth::CurrentUser;

/// GET /api/categories
pub async fn list(
    State(state): State<AppState>,
    rc: RequestContext,
    ApiQuery(query): ApiQuery<CategoryListQuery>,
) -> Response {
    rc.ok(service::list(&state.db, query.is_active).await)
}

/// POST /api/categories
pub async fn create(
    State(state): State<AppState>,
    rc: RequestContext,
    user: CurrentUser,
    ApiJson(dto): ApiJson<CategoryDto>,
) -> Response {
    let ctx = state.service_context(user.id);
    rc.created(service::create(&state.db, &ctx, dto).await)
}

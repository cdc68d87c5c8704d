use axum::extract::State;
use axum::response::Response;
use contracts::domain::a003_account::aggregate::{AccountDto, AccountId, AccountListQuery};
use contracts::shared::api::PageRequest;

use crate::domain::a003_account::service;
use crate::shared::api::{ApiJson, ApiPath, ApiQuery, RequestContext};
use crate::shared::state::AppState;
use crate::system::auth::CurrentUser;

/// GET /api/accounts
pub async fn list(
    State(state): State<AppState>,
    rc: RequestContext,
    ApiQuery(query): ApiQuery<AccountListQuery>,
) -> Response {
    let page = PageRequest::from_params(query.page, query.per_page);
    rc.page(page, service::list(&state.db, &query, page).await)
}

/// GET /api/accounts/:id
pub async fn get_by_id(
    State(state): State<AppState>,
    rc: RequestContext,
    ApiPath(id): ApiPath<AccountId>,
) -> Response {
    rc.ok(service::get(&state.db, id).await)
}

/// POST /api/accounts
pub async fn create(
    State(state): State<AppState>,
    rc: RequestContext,
    user: CurrentUser,
    ApiJson(dto): ApiJson<AccountDto>,
) -> Response {
    let ctx = state.service_context(user.id);
    rc.created(service::create(&state.db, &ctx, dto).await)
}

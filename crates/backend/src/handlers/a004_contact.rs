use axum::extract::State;
use axum::response::Response;
use contracts::domain::a004_contact::aggregate::{ContactDto, ContactId, ContactListQuery};
use contracts::shared::api::PageRequest;

use crate::domain::a004_contact::service;
use crate::shared::api::{ApiJson, ApiPath, ApiQuery, RequestContext};
use crate::shared::state::AppState;
use crate::system::auth::CurrentUser;

/// GET /api/contacts
pub async fn list(
    State(state): State<AppState>,
    rc: RequestContext,
    ApiQuery(query): ApiQuery<ContactListQuery>,
) -> Response {
    let page = PageRequest::from_params(query.page, query.per_page);
    rc.page(page, service::list(&state.db, &query, page).await)
}

/// GET /api/contacts/:id
pub async fn get_by_id(
    State(state): State<AppState>,
    rc: RequestContext,
    ApiPath(id): ApiPath<ContactId>,
) -> Response {
    rc.ok(service::get(&state.db, id).await)
}

/// POST /api/contacts
pub async fn create(
    State(state): State<AppState>,
    rc: RequestContext,
    user: CurrentUser,
    ApiJson(dto): ApiJson<ContactDto>,
) -> Response {
    let ctx = state.service_context(user.id);
    rc.created(service::create(&state.db, &ctx, dto).await)
}

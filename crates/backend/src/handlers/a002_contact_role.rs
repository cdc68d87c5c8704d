use axum::extract::State;
use axum::response::Response;
use contracts::domain::a002_contact_role::aggregate::ContactRoleDto;

use crate::domain::a002_contact_role::service;
use crate::shared::api::{ApiJson, RequestContext};
use crate::shared::state::AppState;
use crate::system::auth::CurrentUser;

/// GET /api/contact-roles
pub async fn list(State(state): State<AppState>, rc: RequestContext) -> Response {
    rc.ok(service::list(&state.db).await)
}

/// POST /api/contact-roles
pub async fn create(
    State(state): State<AppState>,
    rc: RequestContext,
    user: CurrentUser,
    ApiJson(dto): ApiJson<ContactRoleDto>,
) -> Response {
    let ctx = state.service_context(user.id);
    rc.created(service::create(&state.db, &ctx, dto).await)
}

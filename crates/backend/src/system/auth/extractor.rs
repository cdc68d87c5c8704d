use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::Response,
};
use contracts::shared::error_codes::UNAUTHORIZED;
use contracts::system::auth::TokenClaims;
use uuid::Uuid;

use crate::shared::api::{transport_error, RequestId};
use crate::shared::state::AppState;

/// Authenticated caller, placed in request extensions by `require_auth`
///
/// Usage in handlers: `async fn handler(user: CurrentUser) -> Response`
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub claims: TokenClaims,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<CurrentUser>().cloned().ok_or_else(|| {
            transport_error(
                &RequestId::from_extensions(&parts.extensions),
                state.config.display_offset(),
                StatusCode::UNAUTHORIZED,
                UNAUTHORIZED,
                "A valid bearer token is required",
            )
        })
    }
}

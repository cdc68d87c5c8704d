use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use contracts::shared::error_codes::UNAUTHORIZED;
use uuid::Uuid;

use super::extractor::CurrentUser;
use crate::shared::api::{transport_error, RequestId};
use crate::shared::state::AppState;

/// Middleware that requires a valid bearer token.
///
/// On success the caller is stored in request extensions as [`CurrentUser`].
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let user = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .and_then(|token| super::jwt::validate_token(&state.keys, token.trim()).ok())
        .and_then(|claims| {
            Uuid::parse_str(&claims.sub)
                .ok()
                .map(|id| CurrentUser { id, claims })
        });

    match user {
        Some(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        None => {
            let request_id = RequestId::from_extensions(req.extensions());
            tracing::debug!(request_id = %request_id, "Rejected request without a valid bearer token");
            transport_error(
                &request_id,
                state.config.display_offset(),
                StatusCode::UNAUTHORIZED,
                UNAUTHORIZED,
                "A valid bearer token is required",
            )
        }
    }
}

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
    response::Response,
    Json,
};
use contracts::shared::error_codes::{FIELD_INVALID_FORMAT, FIELD_REQUIRED};
use serde::de::DeserializeOwned;

use super::envelope::RequestContext;
use crate::shared::error::ServiceError;
use crate::shared::state::AppState;

/// JSON body whose rejection is a `VALIDATION_ERROR` envelope
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T> FromRequest<AppState> for ApiJson<T>
where
    T: DeserializeOwned,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let ctx = RequestContext::from_parts(req.extensions(), state);
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                let field_code = if rejection.body_text().contains("missing field") {
                    FIELD_REQUIRED
                } else {
                    FIELD_INVALID_FORMAT
                };
                Err(ctx.error(ServiceError::field(
                    "body",
                    field_code,
                    rejection.body_text(),
                )))
            }
        }
    }
}

/// Path parameters; malformed ids become a `VALIDATION_ERROR` envelope
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<T> FromRequestParts<AppState> for ApiPath<T>
where
    T: DeserializeOwned + Send,
{
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => {
                let ctx = RequestContext::from_parts(&parts.extensions, state);
                Err(ctx.error(ServiceError::field(
                    "id",
                    FIELD_INVALID_FORMAT,
                    rejection.body_text(),
                )))
            }
        }
    }
}

/// Query string; unknown enum values and bad ids become a
/// `VALIDATION_ERROR` envelope
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T> FromRequestParts<AppState> for ApiQuery<T>
where
    T: DeserializeOwned + Send,
{
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => {
                let ctx = RequestContext::from_parts(&parts.extensions, state);
                Err(ctx.error(ServiceError::field(
                    "query",
                    FIELD_INVALID_FORMAT,
                    rejection.body_text(),
                )))
            }
        }
    }
}

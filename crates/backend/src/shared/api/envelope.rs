use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, Extensions, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::FixedOffset;
use contracts::domain::common::timestamp_now;
use contracts::shared::api::{
    ApiErrorResponse, ApiResponse, ErrorBody, Page, PageRequest, PaginationMeta, ResponseMeta,
};
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;

use crate::shared::error::ServiceError;
use crate::shared::format::display_timestamp;
use crate::shared::state::AppState;

/// Request id assigned by the request logger middleware
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn from_extensions(extensions: &Extensions) -> String {
        extensions
            .get::<RequestId>()
            .map(|r| r.0.clone())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
    }
}

/// Everything a handler needs to wrap its result into the envelope
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub offset: FixedOffset,
}

#[async_trait]
impl FromRequestParts<AppState> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(&parts.extensions, state))
    }
}

impl RequestContext {
    pub fn from_parts(extensions: &Extensions, state: &AppState) -> Self {
        Self {
            request_id: RequestId::from_extensions(extensions),
            offset: state.config.display_offset(),
        }
    }

    fn timestamp(&self) -> String {
        display_timestamp(timestamp_now(), self.offset)
    }

    fn success<T: Serialize>(&self, status: StatusCode, data: T, meta: Option<ResponseMeta>) -> Response {
        let body = ApiResponse {
            success: true,
            data,
            meta,
            timestamp: self.timestamp(),
            request_id: self.request_id.clone(),
        };
        (status, Json(body)).into_response()
    }

    /// 200 with `data`, or the error envelope
    pub fn ok<T: Serialize>(&self, result: Result<T, ServiceError>) -> Response {
        match result {
            Ok(data) => self.success(StatusCode::OK, data, None),
            Err(err) => self.error(err),
        }
    }

    /// 201 with `data`, or the error envelope
    pub fn created<T: Serialize>(&self, result: Result<T, ServiceError>) -> Response {
        match result {
            Ok(data) => self.success(StatusCode::CREATED, data, None),
            Err(err) => self.error(err),
        }
    }

    /// 200 with the page items as `data` and `meta.pagination`
    pub fn page<T: Serialize>(
        &self,
        request: PageRequest,
        result: Result<Page<T>, ServiceError>,
    ) -> Response {
        match result {
            Ok(page) => {
                let meta = ResponseMeta {
                    pagination: Some(PaginationMeta::new(request, page.total)),
                };
                self.success(StatusCode::OK, page.items, Some(meta))
            }
            Err(err) => self.error(err),
        }
    }

    pub fn error(&self, err: ServiceError) -> Response {
        error_response(&self.request_id, self.offset, err)
    }
}

/// Render a service error as the failure envelope.
///
/// Internal errors are logged here and reach the caller only as an opaque
/// `error_id`.
pub fn error_response(request_id: &str, offset: FixedOffset, err: ServiceError) -> Response {
    let status = err.status();
    let code = err.code();
    let (message, details, field_errors) = match &err {
        ServiceError::NotFound { resource, id, .. } => (
            err.to_string(),
            Some(json!({ "resource": resource, "id": id })),
            None,
        ),
        ServiceError::Validation(errors) => (
            "Request validation failed".to_string(),
            None,
            Some(errors.clone()),
        ),
        ServiceError::Conflict | ServiceError::DeadlineExceeded => (
            err.to_string(),
            Some(json!({ "retryable": true })),
            None,
        ),
        ServiceError::Internal(source) => {
            let error_id = uuid::Uuid::new_v4().to_string();
            tracing::error!(
                request_id,
                error_id = %error_id,
                "Internal error: {:#}",
                source
            );
            (
                "Internal server error".to_string(),
                Some(json!({ "error_id": error_id })),
                None,
            )
        }
        ServiceError::InvalidState { .. } | ServiceError::SubordinateFailed { .. } => {
            (err.to_string(), None, None)
        }
    };

    if !matches!(err, ServiceError::Internal(_)) {
        tracing::debug!(request_id, code, status = status.as_u16(), "{}", message);
    }

    let body = ApiErrorResponse {
        success: false,
        error: ErrorBody {
            code: code.to_string(),
            message,
            details,
            field_errors,
        },
        timestamp: display_timestamp(timestamp_now(), offset),
        request_id: request_id.to_string(),
    };
    (status, Json(body)).into_response()
}

/// Failure envelope for transport-level rejections (401/403) that have no
/// `ServiceError` counterpart
pub fn transport_error(
    request_id: &str,
    offset: FixedOffset,
    status: StatusCode,
    code: &str,
    message: &str,
) -> Response {
    let body = ApiErrorResponse {
        success: false,
        error: ErrorBody {
            code: code.to_string(),
            message: message.to_string(),
            details: None,
            field_errors: None,
        },
        timestamp: display_timestamp(timestamp_now(), offset),
        request_id: request_id.to_string(),
    };
    (status, Json(body)).into_response()
}

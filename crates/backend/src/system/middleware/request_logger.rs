use axum::body::{to_bytes, Body};
use axum::http::{HeaderName, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;

use crate::shared::api::RequestId;
use crate::shared::format::format_number;

pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Request logging middleware
///
/// Assigns a request id (an incoming `x-request-id` is kept), echoes it in the
/// response header and logs duration, response size, status, method and path.
pub async fn request_logger(mut req: Request<Body>, next: Next) -> Response {
    let start = std::time::Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();

    let request_id = req
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.len() <= 128)
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    req.extensions_mut().insert(RequestId(request_id.clone()));

    let response = next.run(req).await;
    let (mut parts, body) = response.into_parts();
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        parts.headers.insert(REQUEST_ID_HEADER.clone(), value);
    }

    // Read the body to learn the real size
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                status = parts.status.as_u16(),
                duration_ms = start.elapsed().as_millis() as u64,
                "{} {} | response body unreadable: {}",
                method,
                uri.path(),
                e
            );
            return Response::from_parts(parts, Body::default());
        }
    };

    let size = format_number(bytes.len());
    let duration_ms = start.elapsed().as_millis() as u64;
    if parts.status.is_server_error() {
        tracing::warn!(
            request_id = %request_id,
            status = parts.status.as_u16(),
            duration_ms,
            size = %size,
            "{} {}",
            method,
            uri.path()
        );
    } else {
        tracing::info!(
            request_id = %request_id,
            status = parts.status.as_u16(),
            duration_ms,
            size = %size,
            "{} {}",
            method,
            uri.path()
        );
    }

    Response::from_parts(parts, Body::from(bytes))
}

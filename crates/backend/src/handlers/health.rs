use axum::extract::State;
use axum::response::Response;
use sea_orm::ConnectionTrait;
use serde_json::json;

use crate::shared::api::RequestContext;
use crate::shared::error::ServiceError;
use crate::shared::state::AppState;

/// GET /health
pub async fn health(State(state): State<AppState>, rc: RequestContext) -> Response {
    let result = state
        .db
        .execute_unprepared("SELECT 1")
        .await
        .map(|_| json!({ "status": "ok", "database": "ok" }))
        .map_err(ServiceError::from);
    rc.ok(result)
}

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use backend::routes::configure_routes;
use backend::shared::config::Config;
use backend::shared::state::AppState;
use backend::system::auth::jwt::generate_access_token;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use common::{catalog, new_lead, qualified_lead, setup, Catalog};

struct Harness {
    app: Router,
    token: String,
    state: AppState,
}

async fn harness() -> Harness {
    let db = setup().await;
    let state = AppState::new(db, Config::embedded().unwrap(), "test-secret");
    let token = generate_access_token(&state.keys, Uuid::new_v4(), "rep.jakarta", false).unwrap();
    Harness {
        app: configure_routes(state.clone()),
        token,
        state,
    }
}

impl Harness {
    async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token));
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = self
            .app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn catalog(&self) -> Catalog {
        catalog(&self.state.db).await
    }
}

#[tokio::test]
async fn test_health_is_public() {
    let h = harness().await;
    let response = h
        .app
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value =
        serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_api_requires_bearer_token() {
    let h = harness().await;
    let response = h
        .app
        .clone()
        .oneshot(Request::get("/api/leads").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value =
        serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let response = h
        .app
        .clone()
        .oneshot(
            Request::get("/api/leads")
                .header(header::AUTHORIZATION, "Bearer not-a-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let h = harness().await;
    let response = h
        .app
        .clone()
        .oneshot(
            Request::get("/api/pipeline-stages")
                .header(header::AUTHORIZATION, format!("Bearer {}", h.token))
                .header("x-request-id", "req-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-42");
    let body: Value =
        serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
    assert_eq!(body["request_id"], "req-42");
    assert!(body["timestamp"].as_str().is_some());
}

#[tokio::test]
async fn test_lead_list_is_paginated() {
    let h = harness().await;
    for _ in 0..3 {
        new_lead(&h.state.db).await;
    }

    let (status, body) = h.send("GET", "/api/leads?page=2&per_page=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    let pagination = &body["meta"]["pagination"];
    assert_eq!(pagination["total"], 3);
    assert_eq!(pagination["total_pages"], 2);
    assert_eq!(pagination["has_next"], false);
    assert_eq!(pagination["has_prev"], true);
}

#[tokio::test]
async fn test_convert_over_http() {
    let h = harness().await;
    let cat = h.catalog().await;
    let lead = qualified_lead(&h.state.db).await;

    let request = json!({
        "title": "Acme oncology supply",
        "stage_id": cat.proposal.base.id,
        "value": 250000,
        "create_account": true,
        "create_contact": true,
    });
    let uri = format!("/api/leads/{}/convert", lead.base.id);
    let (status, body) = h.send("POST", &uri, Some(request.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["lead"]["status"], "converted");
    assert_eq!(body["data"]["deal"]["status"], "open");
    assert_eq!(body["data"]["account"]["name"], "Acme Hospital");

    let (status, body) = h.send("POST", &uri, Some(request)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "LEAD_ALREADY_CONVERTED");
}

#[tokio::test]
async fn test_convert_unqualified_lead_is_unprocessable() {
    let h = harness().await;
    let cat = h.catalog().await;
    let lead = new_lead(&h.state.db).await;

    let (status, body) = h
        .send(
            "POST",
            &format!("/api/leads/{}/convert", lead.base.id),
            Some(json!({ "title": "Too early", "stage_id": cat.proposal.base.id })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "LEAD_CANNOT_CONVERT");
}

#[tokio::test]
async fn test_malformed_input_is_validation_error() {
    let h = harness().await;

    let response = h
        .app
        .clone()
        .oneshot(
            Request::post("/api/leads")
                .header(header::AUTHORIZATION, format!("Bearer {}", h.token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"first_name\": "))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value =
        serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = h.send("GET", "/api/leads/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = h
        .send("GET", &format!("/api/leads/{}", Uuid::new_v4()), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "LEAD_NOT_FOUND");
}

#[tokio::test]
async fn test_move_deal_requires_stage() {
    let h = harness().await;
    let cat = h.catalog().await;
    let (_, account) = h
        .send(
            "POST",
            "/api/accounts",
            Some(json!({ "name": "RS Premier", "category_id": cat.category.base.id })),
        )
        .await;
    let (status, deal) = h
        .send(
            "POST",
            "/api/deals",
            Some(json!({
                "title": "Vaccine tender",
                "account_id": account["data"]["id"],
                "stage_id": cat.prospecting.base.id,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let uri = format!("/api/deals/{}/move", deal["data"]["id"].as_str().unwrap());

    let (status, body) = h.send("POST", &uri, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field_errors"][0]["field"], "stage_id");

    let (status, body) = h
        .send("POST", &uri, Some(json!({ "stage_id": cat.won.base.id })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "won");
}

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::shared::state::AppState;
use crate::system;

/// All application routes.
///
/// `/health` is public; everything under `/api` requires a bearer token.
pub fn configure_routes(state: AppState) -> Router {
    let api = Router::new()
        // ========================================
        // CATALOGS
        // ========================================
        .route(
            "/categories",
            get(handlers::a001_category::list).post(handlers::a001_category::create),
        )
        .route(
            "/contact-roles",
            get(handlers::a002_contact_role::list).post(handlers::a002_contact_role::create),
        )
        // ========================================
        // ACCOUNTS AND CONTACTS
        // ========================================
        .route(
            "/accounts",
            get(handlers::a003_account::list).post(handlers::a003_account::create),
        )
        .route("/accounts/:id", get(handlers::a003_account::get_by_id))
        .route(
            "/contacts",
            get(handlers::a004_contact::list).post(handlers::a004_contact::create),
        )
        .route("/contacts/:id", get(handlers::a004_contact::get_by_id))
        // ========================================
        // LEADS
        // ========================================
        .route(
            "/leads",
            get(handlers::a005_lead::list).post(handlers::a005_lead::create),
        )
        .route(
            "/leads/:id",
            get(handlers::a005_lead::get_by_id)
                .put(handlers::a005_lead::update)
                .delete(handlers::a005_lead::delete),
        )
        .route("/leads/:id/convert", post(handlers::a005_lead::convert))
        .route(
            "/leads/:id/create-account",
            post(handlers::a005_lead::create_account),
        )
        // ========================================
        // PIPELINE AND DEALS
        // ========================================
        .route(
            "/pipeline-stages",
            get(handlers::a006_pipeline_stage::list).post(handlers::a006_pipeline_stage::create),
        )
        .route(
            "/pipeline-stages/reorder",
            post(handlers::a006_pipeline_stage::reorder),
        )
        .route(
            "/pipeline-stages/:id",
            get(handlers::a006_pipeline_stage::get_by_id)
                .put(handlers::a006_pipeline_stage::update)
                .delete(handlers::a006_pipeline_stage::delete),
        )
        .route(
            "/deals",
            get(handlers::a007_deal::list).post(handlers::a007_deal::create),
        )
        .route(
            "/deals/:id",
            get(handlers::a007_deal::get_by_id)
                .put(handlers::a007_deal::update)
                .delete(handlers::a007_deal::delete),
        )
        .route("/deals/:id/move", post(handlers::a007_deal::move_deal))
        // ========================================
        // VISIT REPORTS
        // ========================================
        .route(
            "/visit-reports",
            get(handlers::a008_visit_report::list).post(handlers::a008_visit_report::create),
        )
        .route(
            "/visit-reports/:id",
            get(handlers::a008_visit_report::get_by_id).put(handlers::a008_visit_report::update),
        )
        .route(
            "/visit-reports/:id/check-in",
            post(handlers::a008_visit_report::check_in),
        )
        .route(
            "/visit-reports/:id/check-out",
            post(handlers::a008_visit_report::check_out),
        )
        .route(
            "/visit-reports/:id/approve",
            post(handlers::a008_visit_report::approve),
        )
        .route(
            "/visit-reports/:id/reject",
            post(handlers::a008_visit_report::reject),
        )
        .route(
            "/visit-reports/:id/photos",
            post(handlers::a008_visit_report::upload_photo),
        )
        // ========================================
        // ACTIVITY LOG
        // ========================================
        .route(
            "/activities",
            get(handlers::a009_activity::list).post(handlers::a009_activity::create),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            system::auth::middleware::require_auth,
        ));

    Router::new()
        .route("/health", get(handlers::health::health))
        .nest("/api", api)
        .layer(middleware::from_fn(
            system::middleware::request_logger::request_logger,
        ))
        .with_state(state)
}

use std::net::SocketAddr;

use anyhow::Context;
use axum::http::{header, Method};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use backend::shared::config;
use backend::shared::data::db;
use backend::shared::state::AppState;
use backend::system;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    system::tracing::initialize()?;

    let cfg = config::load_config().context("failed to load configuration")?;
    let conn = db::initialize_database(&cfg)
        .await
        .context("database initialization failed")?;
    let secret = system::auth::jwt::resolve_secret(&cfg);
    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .context("invalid server address")?;
    let state = AppState::new(conn, cfg, &secret);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION]);

    let app = backend::routes::configure_routes(state).layer(cors);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("Server listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}

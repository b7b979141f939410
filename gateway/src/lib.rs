//! Router assembly, split out from `main.rs` so integration tests can build
//! the same app in-process against an ephemeral port (the teacher has no
//! direct precedent for this split since its servers are bin-only; this
//! follows the ordinary axum pattern of a thin binary over a testable lib).

pub mod admin_api;
pub mod error_response;
pub mod json_extractor;
pub mod models;
pub mod proxy;
pub mod reaper;
pub mod tls;
pub mod ws_endpoint;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{any, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use gateway_core::Coordinator;

/// Admin API, dashboard, and reverse-proxy fallthrough (spec §4.6, §4.7).
pub fn build_http_router(coordinator: Arc<Coordinator>) -> Router {
    Router::new()
        .route("/", get(admin_api::login_page))
        .route("/register", post(admin_api::register))
        .route("/heartbeat", post(admin_api::heartbeat))
        .route("/unregister", post(admin_api::unregister))
        .route("/status", get(admin_api::status))
        .route("/debug/sessions", get(admin_api::debug_sessions))
        .route("/api/login", post(admin_api::login))
        .route("/api/logout", post(admin_api::logout))
        .route("/api/stats", get(admin_api::stats))
        .route("/dashboard", get(admin_api::dashboard))
        // Spec §9 design note: explicit routes above, but the `/debug/*` and
        // `/api/*` wildcards cover more paths than are registered here, so
        // `proxy_handler` itself re-checks `is_reserved_route` before ever
        // forwarding a fallback-routed request to a backend.
        .fallback(any(proxy::proxy_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(coordinator)
}

/// Control-plane WebSocket listener (spec §4.5).
pub fn build_ws_router(coordinator: Arc<Coordinator>) -> Router {
    Router::new()
        .route("/", get(ws_endpoint::ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(coordinator)
}

pub async fn run_http_listener(
    coordinator: Arc<Coordinator>,
    shutdown: tokio::sync::broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], coordinator.config.port));
    let app = build_http_router(coordinator.clone());
    tls::serve(app, addr, coordinator.config.tls.as_ref(), shutdown, "http").await
}

pub async fn run_ws_listener(
    coordinator: Arc<Coordinator>,
    shutdown: tokio::sync::broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], coordinator.config.ws_port));
    let app = build_ws_router(coordinator.clone());
    tls::serve(app, addr, coordinator.config.tls.as_ref(), shutdown, "ws").await
}

//! C8 — Admin HTTP API: server-plane registration endpoints, the `/status`
//! and `/debug/sessions` read endpoints, and the dashboard auth/stats/login
//! surface (spec §4.7).
//!
//! Handler shape (JSON in, `Result<_, ApiError>` out) follows `server_sql.rs`'s
//! `AppError`-based handlers; the Router assembly follows `downstream.rs`'s
//! `Router::new().route(...).with_state(...)`.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;

use gateway_core::{GatewayError, HeartbeatUpdate, Registration};
use gateway_core::Coordinator;

use crate::error_response::ApiError;
use crate::json_extractor::ApiJson;
use crate::models::*;

const DASHBOARD_COOKIE: &str = "dashboard_session";

fn check_auth_key(coordinator: &Coordinator, provided: &str) -> Result<(), GatewayError> {
    if !coordinator.config.auth_key.is_empty() && provided == coordinator.config.auth_key {
        Ok(())
    } else {
        Err(GatewayError::Unauthenticated)
    }
}

pub async fn register(
    State(coordinator): State<Arc<Coordinator>>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    check_auth_key(&coordinator, &req.auth_key)?;
    let server_id = coordinator.fleet.register(Registration {
        id: req.id,
        host: req.host,
        public_host: req.public_host,
        port: req.port,
        ws_port: req.ws_port,
        max_connections: req.max_connections,
    })?;
    Ok(Json(RegisterResponse {
        success: true,
        server_id,
    }))
}

pub async fn heartbeat(
    State(coordinator): State<Arc<Coordinator>>,
    ApiJson(req): ApiJson<HeartbeatRequest>,
) -> Result<Json<HeartbeatResponse>, ApiError> {
    check_auth_key(&coordinator, &req.auth_key)?;
    coordinator.fleet.heartbeat(
        &req.id,
        HeartbeatUpdate {
            active_connections: req.active_connections,
            cpu_usage: req.cpu_usage,
            ram_usage: req.ram_usage,
            ram_total: req.ram_total,
            rtt_ms: req.rtt,
        },
    )?;
    Ok(Json(HeartbeatResponse {
        success: true,
        timestamp: chrono::Utc::now().timestamp_millis(),
    }))
}

pub async fn unregister(
    State(coordinator): State<Arc<Coordinator>>,
    ApiJson(req): ApiJson<UnregisterRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    check_auth_key(&coordinator, &req.auth_key)?;
    // Spec §4.1: explicit unregister does NOT migrate sessions, unlike the
    // reaper's dead-server sweep. Sessions stay bound until they time out or
    // the client reconnects and is reassigned.
    coordinator.fleet.unregister(&req.id)?;
    Ok(Json(SuccessResponse { success: true }))
}

fn build_status(coordinator: &Coordinator, recent_limit: usize) -> StatusResponse {
    let servers = coordinator.fleet.snapshot();
    let healthy_servers = coordinator.fleet.healthy_snapshot().len();
    let mut recent = coordinator.migrations.recent();
    recent.reverse();
    recent.truncate(recent_limit);

    StatusResponse {
        total_servers: servers.len(),
        healthy_servers,
        total_active_sessions: coordinator.sessions.len(),
        total_migrations: coordinator.migrations.total_migrations(),
        recent_migrations: recent,
        servers,
    }
}

/// `GET /status` — unauthenticated per spec §4.7's literal endpoint table.
pub async fn status(State(coordinator): State<Arc<Coordinator>>) -> Json<StatusResponse> {
    Json(build_status(&coordinator, 10))
}

/// `GET /debug/sessions` — unauthenticated per spec §4.7 (an Open Question
/// the spec explicitly leaves unresolved; left as documented rather than
/// gated, see DESIGN.md).
pub async fn debug_sessions(State(coordinator): State<Arc<Coordinator>>) -> Json<DebugSessionsResponse> {
    Json(DebugSessionsResponse {
        sessions: coordinator.sessions.snapshot(),
    })
}

pub async fn login(
    State(coordinator): State<Arc<Coordinator>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Response, ApiError> {
    check_auth_key(&coordinator, &req.auth_key)?;
    let token = coordinator.dashboard.issue();
    let cookie = format!("{DASHBOARD_COOKIE}={token}; HttpOnly; Path=/; Max-Age=3600; SameSite=Strict");
    Ok((
        [(axum::http::header::SET_COOKIE, cookie)],
        Json(SuccessResponse { success: true }),
    )
        .into_response())
}

pub async fn logout(State(coordinator): State<Arc<Coordinator>>, headers: HeaderMap) -> Response {
    if let Some(token) = cookie_value(&headers, DASHBOARD_COOKIE) {
        coordinator.dashboard.revoke(&token);
    }
    let cleared = format!("{DASHBOARD_COOKIE}=; HttpOnly; Path=/; Max-Age=0; SameSite=Strict");
    ([(axum::http::header::SET_COOKIE, cleared)], Json(SuccessResponse { success: true })).into_response()
}

pub async fn stats(
    State(coordinator): State<Arc<Coordinator>>,
    headers: HeaderMap,
) -> Result<Json<StatusResponse>, ApiError> {
    require_dashboard_session(&coordinator, &headers)?;
    Ok(Json(build_status(&coordinator, 100)))
}

pub async fn dashboard(
    State(coordinator): State<Arc<Coordinator>>,
    headers: HeaderMap,
) -> Response {
    if require_dashboard_session(&coordinator, &headers).is_err() {
        return axum::response::Redirect::to("/").into_response();
    }
    Html(DASHBOARD_HTML).into_response()
}

pub async fn login_page() -> Html<&'static str> {
    Html(LOGIN_HTML)
}

fn require_dashboard_session(coordinator: &Coordinator, headers: &HeaderMap) -> Result<(), GatewayError> {
    let token = cookie_value(headers, DASHBOARD_COOKIE).ok_or(GatewayError::Unauthenticated)?;
    if coordinator.dashboard.touch(&token) {
        Ok(())
    } else {
        Err(GatewayError::Unauthenticated)
    }
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let pair = pair.trim();
        let (k, v) = pair.split_once('=')?;
        (k == name).then(|| v.to_string())
    })
}

const LOGIN_HTML: &str = r#"<!doctype html>
<html><head><title>Gateway Login</title></head>
<body>
<h1>Gateway Dashboard</h1>
<form method="post" action="/api/login" onsubmit="return false;">
  <input type="password" id="authKey" placeholder="auth key">
  <button onclick="login()">Log in</button>
</form>
<script>
function login() {
  fetch('/api/login', {
    method: 'POST',
    headers: {'Content-Type': 'application/json'},
    body: JSON.stringify({authKey: document.getElementById('authKey').value}),
  }).then(r => { if (r.ok) window.location = '/dashboard'; });
}
</script>
</body></html>"#;

const DASHBOARD_HTML: &str = r#"<!doctype html>
<html><head><title>Gateway Dashboard</title></head>
<body>
<h1>Fleet status</h1>
<pre id="stats">loading...</pre>
<script>
fetch('/api/stats').then(r => r.json()).then(j => {
  document.getElementById('stats').textContent = JSON.stringify(j, null, 2);
});
</script>
</body></html>"#;

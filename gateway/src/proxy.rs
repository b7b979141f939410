//! C7 — HTTP reverse proxy (spec §4.6).
//!
//! The teacher has no reverse-proxy precedent; this is built from `reqwest`
//! (already in the teacher's dependency graph via `lib_common::retrieve`)
//! combined with `server_sql.rs`'s manual request-in/response-out handler
//! shape, since axum has no built-in proxy helper.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use rand::Rng as _;
use uuid::Uuid;

use gateway_core::config::is_reserved_route;
use gateway_core::Coordinator;

const PROXY_COOKIE: &str = "gateway_http_session";
const ORIGIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Forwards any request not claimed by a gateway route to a backend chosen
/// per spec §4.6, maintaining HTTP stickiness via `gateway_http_session`.
///
/// Only reached via the router's `.fallback(...)`, i.e. for paths that
/// didn't match one of the explicitly registered routes. Spec §4.6's route
/// set also reserves the `/debug/*` and `/api/*` wildcards wholesale (not
/// just the handful of `/debug`/`/api` paths this gateway happens to
/// register), so an unmatched path under those prefixes must still be
/// excluded from proxying rather than silently falling through to a backend.
pub async fn proxy_handler(
    State(coordinator): State<Arc<Coordinator>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if is_reserved_route(uri.path()) {
        return StatusCode::NOT_FOUND.into_response();
    }

    if coordinator.fleet.is_empty() {
        return (StatusCode::SERVICE_UNAVAILABLE, "No game servers available").into_response();
    }

    let existing_cookie = extract_cookie(&headers, PROXY_COOKIE);
    let mut set_cookie = None;

    let server = match existing_cookie
        .as_deref()
        .and_then(|id| coordinator.sessions.touch(id).map(|server_id| (id.to_string(), server_id)))
        .and_then(|(_, server_id)| coordinator.fleet.get(&server_id))
    {
        Some(server) => server,
        None => {
            let servers = coordinator.fleet.all_servers();
            if servers.is_empty() {
                return (StatusCode::SERVICE_UNAVAILABLE, "No game servers available").into_response();
            }
            let server = servers[rand::rng().random_range(0..servers.len())].clone();
            let session_id = format!("http-{}", Uuid::new_v4());
            coordinator.sessions.bind(&session_id, &server.id);
            set_cookie = Some(format!(
                "{PROXY_COOKIE}={session_id}; Path=/; Max-Age=3600; SameSite=Lax; HttpOnly"
            ));
            server
        }
    };

    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let origin_url = format!("http://{}:{}{}", server.host, server.port, path_and_query);

    let client = reqwest::Client::new();
    let mut request = client.request(method, &origin_url).timeout(ORIGIN_TIMEOUT);
    for (name, value) in headers.iter() {
        if name == axum::http::header::HOST {
            continue;
        }
        request = request.header(name.as_str(), value.as_bytes());
    }
    request = request.body(body.to_vec());

    let origin_response = match request.send().await {
        Ok(resp) => resp,
        Err(err) => {
            tracing::error!(%err, origin = %origin_url, "proxy origin failure");
            return (StatusCode::BAD_GATEWAY, "Failed to fetch resource").into_response();
        }
    };

    let status = StatusCode::from_u16(origin_response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut response_headers = HeaderMap::new();
    for (name, value) in origin_response.headers().iter() {
        if let Ok(name) = HeaderName::from_bytes(name.as_str().as_bytes()) {
            if let Ok(value) = HeaderValue::from_bytes(value.as_bytes()) {
                response_headers.append(name, value);
            }
        }
    }
    if let Some(cookie) = set_cookie {
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response_headers.append(axum::http::header::SET_COOKIE, value);
        }
    }

    let body = match origin_response.bytes().await {
        Ok(b) => b,
        Err(err) => {
            tracing::error!(%err, origin = %origin_url, "proxy body read failure");
            return (StatusCode::BAD_GATEWAY, "Failed to fetch resource").into_response();
        }
    };

    (status, response_headers, body).into_response()
}

fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let pair = pair.trim();
        let (k, v) = pair.split_once('=')?;
        (k == name).then(|| v.to_string())
    })
}

//! In-process end-to-end scenarios from spec §8, driven against a real
//! `axum::serve` listener on an ephemeral port — the same "spin up the real
//! server, drive it over the wire" approach `test_yahoo_server_throughput.rs`
//! takes against a live deployment, adapted here to run self-contained.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;

use gateway::build_http_router;
use gateway::build_ws_router;
use gateway_core::{Coordinator, GatewayConfig};

async fn spawn_http(coordinator: Arc<Coordinator>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_http_router(coordinator);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn spawn_ws(coordinator: Arc<Coordinator>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_ws_router(coordinator);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn test_coordinator() -> Arc<Coordinator> {
    let mut config = GatewayConfig::default();
    config.server_timeout = Duration::from_millis(200);
    config.session_timeout = Duration::from_secs(60);
    config.auth_key = "test-key".to_string();
    Arc::new(Coordinator::new(config))
}

async fn register(base: &str, client: &reqwest::Client, id: &str) {
    let resp = client
        .post(format!("{base}/register"))
        .json(&json!({
            "id": id, "host": format!("{id}host"), "port": 8080, "wsPort": 9090,
            "maxConnections": 1000, "authKey": "test-key"
        }))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
}

async fn connect_and_assign(ws_base: &str, client_id: &str) -> Value {
    let url = format!("{ws_base}/?clientId={client_id}");
    let (mut socket, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    let msg = socket.next().await.unwrap().unwrap();
    let _ = socket.close(None).await;
    match msg {
        WsMessage::Text(text) => serde_json::from_str(&text).unwrap(),
        other => panic!("unexpected frame: {other:?}"),
    }
}

#[tokio::test]
async fn basic_sticky_session_survives_reconnect() {
    let coordinator = test_coordinator();
    let http_addr = spawn_http(coordinator.clone()).await;
    let ws_addr = spawn_ws(coordinator.clone()).await;
    let http_base = format!("http://{http_addr}");
    let ws_base = format!("ws://{ws_addr}");
    let client = reqwest::Client::new();

    register(&http_base, &client, "s1").await;

    let first = connect_and_assign(&ws_base, "c1").await;
    assert_eq!(first["type"], "server_assignment");
    assert_eq!(first["server"]["host"], "s1host");

    let second = connect_and_assign(&ws_base, "c1").await;
    assert_eq!(second["server"]["host"], "s1host");
}

#[tokio::test]
async fn round_robin_across_two_servers() {
    let coordinator = test_coordinator();
    let http_addr = spawn_http(coordinator.clone()).await;
    let ws_addr = spawn_ws(coordinator.clone()).await;
    let http_base = format!("http://{http_addr}");
    let ws_base = format!("ws://{ws_addr}");
    let client = reqwest::Client::new();

    register(&http_base, &client, "s1").await;
    register(&http_base, &client, "s2").await;

    let mut hosts = Vec::new();
    for client_id in ["c1", "c2", "c3"] {
        let assignment = connect_and_assign(&ws_base, client_id).await;
        hosts.push(assignment["server"]["host"].as_str().unwrap().to_string());
    }
    assert_eq!(hosts, vec!["s1host", "s2host", "s1host"]);
}

#[tokio::test]
async fn dead_server_migration_moves_sessions() {
    let coordinator = test_coordinator();
    let http_addr = spawn_http(coordinator.clone()).await;
    let ws_addr = spawn_ws(coordinator.clone()).await;
    let http_base = format!("http://{http_addr}");
    let ws_base = format!("ws://{ws_addr}");
    let client = reqwest::Client::new();

    register(&http_base, &client, "s1").await;
    register(&http_base, &client, "s2").await;

    connect_and_assign(&ws_base, "c1").await;
    connect_and_assign(&ws_base, "c2").await;
    assert_eq!(coordinator.sessions.get("c1").unwrap().server_id, "s1");
    assert_eq!(coordinator.sessions.get("c2").unwrap().server_id, "s1");

    // Let s1's heartbeat go stale, then run the sweep the reaper would run.
    tokio::time::sleep(Duration::from_millis(250)).await;
    let results = coordinator.sweep_dead_servers();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, "s1");
    assert_eq!(results[0].1.migrated, 2);

    assert!(!coordinator.fleet.contains("s1"));
    assert_eq!(coordinator.sessions.get("c1").unwrap().server_id, "s2");
    assert_eq!(coordinator.sessions.get("c2").unwrap().server_id, "s2");
    assert_eq!(coordinator.migrations.total_migrations(), 2);
}

#[tokio::test]
async fn migration_with_no_targets_strands_and_deletes_session() {
    let coordinator = test_coordinator();
    let http_addr = spawn_http(coordinator.clone()).await;
    let ws_addr = spawn_ws(coordinator.clone()).await;
    let http_base = format!("http://{http_addr}");
    let ws_base = format!("ws://{ws_addr}");
    let client = reqwest::Client::new();

    register(&http_base, &client, "s1").await;
    connect_and_assign(&ws_base, "c1").await;

    tokio::time::sleep(Duration::from_millis(250)).await;
    let results = coordinator.sweep_dead_servers();
    assert_eq!(results[0].1.stranded, 1);
    assert!(coordinator.sessions.get("c1").is_none());
    assert_eq!(coordinator.migrations.total_migrations(), 0);
}

#[tokio::test]
async fn http_proxy_sets_cookie_and_stays_sticky() {
    // The proxy forwards to a real origin, so register a tiny loopback HTTP
    // server as the "game server" origin to forward to.
    let origin_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let origin_addr = origin_listener.local_addr().unwrap();
    tokio::spawn(async move {
        let app = axum::Router::new().route(
            "/map.json",
            axum::routing::get(|| async { axum::Json(json!({"ok": true})) }),
        );
        axum::serve(origin_listener, app).await.unwrap();
    });

    let coordinator = test_coordinator();
    let http_addr = spawn_http(coordinator.clone()).await;
    let http_base = format!("http://{http_addr}");
    let client = reqwest::Client::builder().cookie_store(false).build().unwrap();

    client
        .post(format!("{http_base}/register"))
        .json(&json!({
            "id": "origin", "host": "127.0.0.1", "port": origin_addr.port(),
            "wsPort": 9090, "maxConnections": 100, "authKey": "test-key"
        }))
        .send()
        .await
        .unwrap();

    let resp = client.get(format!("{http_base}/map.json")).send().await.unwrap();
    assert!(resp.status().is_success());
    let cookie = resp
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .expect("expected Set-Cookie on first proxied request")
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.contains("gateway_http_session=http-"));
}

#[tokio::test]
async fn unauthenticated_register_is_rejected() {
    let coordinator = test_coordinator();
    let http_addr = spawn_http(coordinator.clone()).await;
    let http_base = format!("http://{http_addr}");
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{http_base}/register"))
        .json(&json!({
            "id": "s1", "host": "s1host", "port": 8080, "wsPort": 9090,
            "maxConnections": 10, "authKey": "wrong-key"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_missing_max_connections_is_bad_request() {
    let coordinator = test_coordinator();
    let http_addr = spawn_http(coordinator.clone()).await;
    let http_base = format!("http://{http_addr}");
    let client = reqwest::Client::new();

    // Spec §4.1: `maxConnections` is required, unlike `publicHost`. Omitting
    // it entirely must fail validation, not register a capacity-0 server.
    let resp = client
        .post(format!("{http_base}/register"))
        .json(&json!({
            "id": "s1", "host": "s1host", "port": 8080, "wsPort": 9090,
            "authKey": "test-key"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn malformed_register_body_is_bad_request_not_422() {
    let coordinator = test_coordinator();
    let http_addr = spawn_http(coordinator.clone()).await;
    let http_base = format!("http://{http_addr}");
    let client = reqwest::Client::new();

    // A structurally invalid body (wrong type for `port`) must be normalized
    // through the spec §7 taxonomy — 400 JSON {error:"..."} — rather than
    // axum's default 422 JsonRejection with a plain-text body.
    let resp = client
        .post(format!("{http_base}/register"))
        .header("content-type", "application/json")
        .body(r#"{"id":"s1","host":"s1host","port":"not-a-number","wsPort":9090,"maxConnections":10,"authKey":"test-key"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());
}

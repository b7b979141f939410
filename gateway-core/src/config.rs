//! Configuration loading (spec §3 "Configuration", §4.8 "Config & transport").
//!
//! Precedence mirrors `yahoo_logic::config::load_config` in the teacher: an
//! optional JSON file on disk supplies defaults, and environment variables
//! win over the file. Unlike the teacher (which uses `clap::Parser` for the
//! CLI/env layer), the gateway has no CLI surface worth exposing beyond a
//! single `--config` path, so this module reads env vars directly with
//! `std::env::var` and leaves argument parsing to `gateway`'s `main.rs`.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Hard 1-hour expiry for dashboard operator sessions (spec §3 `DashboardSession`).
pub const DASHBOARD_SESSION_TIMEOUT: Duration = Duration::from_secs(3600);

/// Gateway routes that are never reverse-proxied (spec §4.6).
pub const RESERVED_ROUTES: &[&str] = &[
    "/", "/register", "/heartbeat", "/unregister", "/status", "/debug", "/api", "/dashboard",
];

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct FileConfig {
    gateway: Option<FileGatewaySection>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct FileGatewaySection {
    port: Option<u16>,
    ws_port: Option<u16>,
    heartbeat_interval: Option<u64>,
    server_timeout: Option<u64>,
    session_timeout: Option<u64>,
    auth_key: Option<String>,
    max_buffer_size: Option<u64>,
    tls_cert_path: Option<PathBuf>,
    tls_key_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// HTTP port for the admin API, dashboard and reverse proxy.
    pub port: u16,
    /// WebSocket port for the control-plane endpoint (C6).
    pub ws_port: u16,
    /// How often the dead-server sweep runs (spec §4.4).
    pub heartbeat_interval: Duration,
    /// Max heartbeat silence before a server is evicted (spec §4.1, §4.4).
    pub server_timeout: Duration,
    /// Max session idleness before the expired-session sweep deletes it (spec §4.4).
    pub session_timeout: Duration,
    /// Shared secret for server registration and dashboard login.
    pub auth_key: String,
    /// Backpressure ceiling in bytes for WS sends (spec §4.5). Default 1 GiB.
    pub max_buffer_size: u64,
    /// TLS material, if configured and loadable. `None` means the listeners
    /// bind plain HTTP/WS.
    pub tls: Option<TlsConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: 80,
            ws_port: 8081,
            heartbeat_interval: Duration::from_secs(30),
            server_timeout: Duration::from_secs(90),
            session_timeout: Duration::from_secs(300),
            auth_key: String::new(),
            max_buffer_size: 1024 * 1024 * 1024,
            tls: None,
        }
    }
}

fn env_u16(name: &str) -> Option<u16> {
    std::env::var(name).ok()?.parse().ok()
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok()?.parse().ok()
}

fn env_bool(name: &str) -> bool {
    matches!(
        std::env::var(name).ok().as_deref(),
        Some("1") | Some("true") | Some("TRUE") | Some("yes")
    )
}

impl GatewayConfig {
    /// Loads configuration following spec §4.8's precedence:
    /// env vars, then the optional JSON config file, then the hardcoded
    /// defaults above. `config_path` is read if it exists; a missing or
    /// unparseable file is silently treated as "no file config", matching
    /// the teacher's `config_from_file` which discards read/parse errors
    /// with `.ok()`.
    pub fn load(config_path: Option<&Path>) -> Self {
        let file = config_path
            .and_then(|p| std::fs::read_to_string(p).ok())
            .and_then(|body| serde_json::from_str::<FileConfig>(&body).ok())
            .and_then(|c| c.gateway)
            .unwrap_or_default();

        let defaults = GatewayConfig::default();

        let use_ssl = env_bool("WEBSRV_USESSL");
        let tls = if use_ssl {
            let cert = std::env::var("WEBSRV_CERT_PATH")
                .ok()
                .map(PathBuf::from)
                .or_else(|| file.tls_cert_path.clone());
            let key = std::env::var("WEBSRV_KEY_PATH")
                .ok()
                .map(PathBuf::from)
                .or_else(|| file.tls_key_path.clone());
            match (cert, key) {
                (Some(cert_path), Some(key_path)) if cert_path.is_file() && key_path.is_file() => {
                    Some(TlsConfig { cert_path, key_path })
                }
                _ => {
                    tracing::warn!("WEBSRV_USESSL set but no loadable cert/key pair found; falling back to plain transport");
                    None
                }
            }
        } else {
            None
        };

        let port = if tls.is_some() {
            env_u16("WEBSRV_PORTSSL").unwrap_or(443)
        } else {
            env_u16("WEBSRV_PORT")
                .or(env_u16("GATEWAY_PORT"))
                .or(file.port)
                .unwrap_or(defaults.port)
        };

        let ws_port = env_u16("GATEWAY_WS_PORT").or(file.ws_port).unwrap_or(defaults.ws_port);

        let heartbeat_interval = env_u64("HEARTBEAT_INTERVAL")
            .or(file.heartbeat_interval)
            .map(Duration::from_secs)
            .unwrap_or(defaults.heartbeat_interval);

        let server_timeout = env_u64("SERVER_TIMEOUT")
            .or(file.server_timeout)
            .map(Duration::from_secs)
            .unwrap_or(defaults.server_timeout);

        let session_timeout = env_u64("SESSION_TIMEOUT")
            .or(file.session_timeout)
            .map(Duration::from_secs)
            .unwrap_or(defaults.session_timeout);

        let auth_key = std::env::var("GATEWAY_AUTH_KEY")
            .ok()
            .or(file.auth_key)
            .unwrap_or(defaults.auth_key);

        let max_buffer_size = file.max_buffer_size.unwrap_or(defaults.max_buffer_size);

        Self {
            port,
            ws_port,
            heartbeat_interval,
            server_timeout,
            session_timeout,
            auth_key,
            max_buffer_size,
            tls,
        }
    }
}

/// True if `path` is one of the gateway's own routes (or a prefix of
/// `/debug` or `/api`), i.e. traffic that must NOT fall through to the
/// reverse proxy (spec §4.6).
pub fn is_reserved_route(path: &str) -> bool {
    if path == "/" {
        return true;
    }
    RESERVED_ROUTES
        .iter()
        .filter(|r| **r != "/")
        .any(|r| path == *r || path.starts_with(&format!("{r}/")))
}

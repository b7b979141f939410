//! Wire-format payloads (spec §9: "replace ad-hoc object shapes with tagged
//! structures"). Every JSON body the gateway accepts or emits is named here
//! rather than built ad hoc in the handlers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub id: String,
    pub host: String,
    #[serde(default)]
    pub public_host: Option<String>,
    pub port: u16,
    pub ws_port: u16,
    pub max_connections: u32,
    pub auth_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatRequest {
    pub id: String,
    #[serde(default)]
    pub active_connections: u32,
    #[serde(default)]
    pub cpu_usage: Option<f32>,
    #[serde(default)]
    pub ram_usage: Option<u64>,
    #[serde(default)]
    pub ram_total: Option<u64>,
    #[serde(default)]
    pub rtt: Option<u64>,
    pub auth_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnregisterRequest {
    pub id: String,
    pub auth_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub success: bool,
    pub server_id: String,
}

#[derive(Debug, Serialize)]
pub struct HeartbeatResponse {
    pub success: bool,
    pub timestamp: i64,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub auth_key: String,
}

/// Outbound control-plane frame on a successful assignment (spec §6).
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename = "server_assignment", rename_all = "camelCase")]
pub struct AssignmentFrame {
    pub client_id: String,
    pub server: AssignmentTarget,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentTarget {
    pub host: String,
    pub port: u16,
    pub ws_port: u16,
}

/// Outbound control-plane frame on failure (spec §6).
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename = "error")]
pub struct ErrorFrame {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub total_servers: usize,
    pub healthy_servers: usize,
    pub total_active_sessions: usize,
    pub total_migrations: u64,
    pub recent_migrations: Vec<gateway_core::MigrationRecord>,
    pub servers: Vec<gateway_core::fleet::ServerSnapshot>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugSessionsResponse {
    pub sessions: Vec<gateway_core::sessions::SessionSnapshot>,
}

//! C1 — Fleet registry: the authoritative map of live game servers.
//!
//! Grounded on `lib_common::core::registry::Registry` — a synchronous
//! `Mutex`-guarded `HashMap` mutated through small, single-purpose methods —
//! generalized from a symbol refcount to a full `GameServer` record, and
//! switched to `RwLock` since snapshots (reads) vastly outnumber
//! registrations/heartbeats (writes) on a live fleet.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::GatewayError;

/// One registered backend (spec §3 `GameServer`).
#[derive(Debug, Clone)]
pub struct GameServer {
    pub id: String,
    pub host: String,
    pub public_host: String,
    pub port: u16,
    pub ws_port: u16,
    pub last_heartbeat: Instant,
    pub active_connections: u32,
    pub max_connections: u32,
    pub cpu_usage: Option<f32>,
    pub ram_usage: Option<u64>,
    pub ram_total: Option<u64>,
    /// Half of the last heartbeat round-trip-time, in milliseconds.
    pub latency: Option<u64>,
}

impl GameServer {
    fn has_capacity(&self) -> bool {
        self.active_connections < self.max_connections
    }
}

/// JSON shape returned by `/status`, `/api/stats` and `/debug/sessions`
/// (spec §6).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSnapshot {
    pub id: String,
    pub host: String,
    pub public_host: String,
    pub port: u16,
    pub ws_port: u16,
    pub active_connections: u32,
    pub max_connections: u32,
    /// Milliseconds since the epoch-relative process start; callers only
    /// care about relative freshness, computed from the monotonic
    /// `Instant` at snapshot time.
    pub last_heartbeat_ms_ago: u64,
    pub cpu_usage: Option<f32>,
    pub ram_usage: Option<u64>,
    pub ram_total: Option<u64>,
    pub latency: Option<u64>,
    pub status: &'static str,
}

/// Parameters for `Fleet::register` (spec §4.1).
pub struct Registration {
    pub id: String,
    pub host: String,
    pub public_host: Option<String>,
    pub port: u16,
    pub ws_port: u16,
    pub max_connections: u32,
}

/// Parameters for `Fleet::heartbeat` (spec §4.1).
#[derive(Default)]
pub struct HeartbeatUpdate {
    pub active_connections: u32,
    pub cpu_usage: Option<f32>,
    pub ram_usage: Option<u64>,
    pub ram_total: Option<u64>,
    pub rtt_ms: Option<u64>,
}

pub struct Fleet {
    servers: RwLock<HashMap<String, GameServer>>,
    server_timeout: Duration,
}

impl Fleet {
    pub fn new(server_timeout: Duration) -> Self {
        Self {
            servers: RwLock::new(HashMap::new()),
            server_timeout,
        }
    }

    /// Registers or re-registers a server. Re-registration preserves
    /// `activeConnections` (spec §4.1, testable property "Re-registration
    /// preserves load").
    pub fn register(&self, reg: Registration) -> Result<String, GatewayError> {
        // Spec §4.1: only `publicHost` is optional. `maxConnections` has no
        // `?` and is required, unlike `publicHost` — a missing/zero value
        // here must fail the same way a missing `host` does, not silently
        // register a server with no capacity.
        if reg.id.is_empty()
            || reg.host.is_empty()
            || reg.port == 0
            || reg.ws_port == 0
            || reg.max_connections == 0
        {
            return Err(GatewayError::BadRequest("missing required field".into()));
        }

        let mut servers = self.servers.write().expect("fleet lock poisoned");
        let active_connections = servers
            .get(&reg.id)
            .map(|existing| existing.active_connections)
            .unwrap_or(0);

        let public_host = reg.public_host.unwrap_or_else(|| reg.host.clone());

        servers.insert(
            reg.id.clone(),
            GameServer {
                id: reg.id.clone(),
                host: reg.host,
                public_host,
                port: reg.port,
                ws_port: reg.ws_port,
                last_heartbeat: Instant::now(),
                active_connections,
                max_connections: reg.max_connections,
                cpu_usage: None,
                ram_usage: None,
                ram_total: None,
                latency: None,
            },
        );

        tracing::info!(server_id = %reg.id, "server registered");
        Ok(reg.id)
    }

    /// Applies a heartbeat update. Returns the gateway's current monotonic
    /// tick count so the caller can stamp the response timestamp itself
    /// (spec §4.1: "a response containing the gateway's current timestamp").
    pub fn heartbeat(&self, id: &str, update: HeartbeatUpdate) -> Result<(), GatewayError> {
        let mut servers = self.servers.write().expect("fleet lock poisoned");
        let server = servers
            .get_mut(id)
            .ok_or_else(|| GatewayError::NotFound(format!("server {id} not found")))?;

        server.active_connections = update.active_connections;
        server.cpu_usage = update.cpu_usage;
        server.ram_usage = update.ram_usage;
        server.ram_total = update.ram_total;
        if let Some(rtt) = update.rtt_ms {
            server.latency = Some(rtt / 2);
        }
        server.last_heartbeat = Instant::now();
        Ok(())
    }

    pub fn unregister(&self, id: &str) -> Result<(), GatewayError> {
        let mut servers = self.servers.write().expect("fleet lock poisoned");
        servers
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| GatewayError::NotFound(format!("server {id} not found")))
    }

    /// Removes `id` unconditionally, returning whether it was present.
    /// Used by the reaper (C5) after C4 has already migrated its sessions.
    pub fn remove(&self, id: &str) -> bool {
        self.servers
            .write()
            .expect("fleet lock poisoned")
            .remove(id)
            .is_some()
    }

    pub fn is_healthy(&self, server: &GameServer) -> bool {
        server.last_heartbeat.elapsed() < self.server_timeout && server.has_capacity()
    }

    pub fn get(&self, id: &str) -> Option<GameServer> {
        self.servers.read().expect("fleet lock poisoned").get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.servers.read().expect("fleet lock poisoned").contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.servers.read().expect("fleet lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Servers that are within `server_timeout` AND have spare capacity —
    /// the GLOSSARY definition of "healthy server", used by C3 and C4.
    ///
    /// Sorted by id: C3's round-robin index is only meaningful against a
    /// stable snapshot ordering (spec §4.2: "tie-breaking: index order
    /// within the snapshot"), and a `HashMap`'s iteration order is not it.
    pub fn healthy_snapshot(&self) -> Vec<GameServer> {
        let servers = self.servers.read().expect("fleet lock poisoned");
        let mut healthy: Vec<GameServer> = servers
            .values()
            .filter(|s| s.last_heartbeat.elapsed() < self.server_timeout && s.has_capacity())
            .cloned()
            .collect();
        healthy.sort_by(|a, b| a.id.cmp(&b.id));
        healthy
    }

    /// Ids of servers whose last heartbeat is older than `server_timeout`,
    /// regardless of capacity — what C5's dead-server sweep iterates.
    pub fn expired_ids(&self) -> Vec<String> {
        let servers = self.servers.read().expect("fleet lock poisoned");
        servers
            .values()
            .filter(|s| s.last_heartbeat.elapsed() > self.server_timeout)
            .map(|s| s.id.clone())
            .collect()
    }

    /// Every currently registered server, for uniform-random proxy selection
    /// (spec §4.6) which — unlike C3 — doesn't filter by capacity. Returned
    /// as full records under a single lock acquisition so the caller can
    /// pick one without a second, racy `get()` against an id that may have
    /// been removed (e.g. by the reaper) in between.
    pub fn all_servers(&self) -> Vec<GameServer> {
        self.servers.read().expect("fleet lock poisoned").values().cloned().collect()
    }

    /// Full point-in-time snapshot for `/status`, `/api/stats`, `/debug/sessions`.
    pub fn snapshot(&self) -> Vec<ServerSnapshot> {
        let servers = self.servers.read().expect("fleet lock poisoned");
        servers
            .values()
            .map(|s| ServerSnapshot {
                id: s.id.clone(),
                host: s.host.clone(),
                public_host: s.public_host.clone(),
                port: s.port,
                ws_port: s.ws_port,
                active_connections: s.active_connections,
                max_connections: s.max_connections,
                last_heartbeat_ms_ago: s.last_heartbeat.elapsed().as_millis() as u64,
                cpu_usage: s.cpu_usage,
                ram_usage: s.ram_usage,
                ram_total: s.ram_total,
                latency: s.latency,
                status: if s.last_heartbeat.elapsed() < self.server_timeout {
                    "healthy"
                } else {
                    "unhealthy"
                },
            })
            .collect()
    }
}

//! C2 — Session table: the authoritative client/session → server bindings.
//!
//! Same `RwLock<HashMap>` shape as `fleet.rs`, grounded on the same
//! `lib_common::core::registry::Registry` pattern and on
//! `yahoo_logic::state::AppState`'s "look up, mutate in place, create if
//! absent" control flow (`AppState::subscribe`).

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use serde::Serialize;

/// One sticky binding (spec §3 `ClientSession`). The `http-*` namespace for
/// HTTP proxy sessions shares this same table (spec §4.6 invariant).
#[derive(Debug, Clone)]
pub struct ClientSession {
    pub client_id: String,
    pub server_id: String,
    pub last_activity: Instant,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub client_id: String,
    pub server_id: String,
    pub idle_ms: u64,
}

pub struct SessionTable {
    sessions: RwLock<HashMap<String, ClientSession>>,
    session_timeout: Duration,
}

impl SessionTable {
    pub fn new(session_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            session_timeout,
        }
    }

    /// Returns the session's current `serverId`, refreshing `lastActivity`
    /// as a side effect of the lookup (spec §3 invariant: "lastActivity
    /// refreshed on each lookup").
    pub fn touch(&self, client_id: &str) -> Option<String> {
        let mut sessions = self.sessions.write().expect("session lock poisoned");
        let session = sessions.get_mut(client_id)?;
        session.last_activity = Instant::now();
        Some(session.server_id.clone())
    }

    /// Creates (or overwrites) a binding for `client_id` → `server_id`,
    /// stamping `lastActivity` to now. Used both for fresh assignment (C3)
    /// and for migration rewrites (C4), which also want a fresh idle
    /// budget (spec §4.3 step 5).
    pub fn bind(&self, client_id: &str, server_id: &str) {
        let mut sessions = self.sessions.write().expect("session lock poisoned");
        sessions.insert(
            client_id.to_string(),
            ClientSession {
                client_id: client_id.to_string(),
                server_id: server_id.to_string(),
                last_activity: Instant::now(),
            },
        );
    }

    pub fn remove(&self, client_id: &str) -> bool {
        self.sessions
            .write()
            .expect("session lock poisoned")
            .remove(client_id)
            .is_some()
    }

    pub fn get(&self, client_id: &str) -> Option<ClientSession> {
        self.sessions
            .read()
            .expect("session lock poisoned")
            .get(client_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().expect("session lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every `client_id` currently bound to `server_id` — what C4 collects
    /// before migrating a dead server's sessions.
    pub fn clients_of(&self, server_id: &str) -> Vec<String> {
        self.sessions
            .read()
            .expect("session lock poisoned")
            .values()
            .filter(|s| s.server_id == server_id)
            .map(|s| s.client_id.clone())
            .collect()
    }

    /// `client_id`s whose session has been idle longer than
    /// `session_timeout` — what C5's expired-session sweep deletes.
    pub fn expired_ids(&self) -> Vec<String> {
        self.sessions
            .read()
            .expect("session lock poisoned")
            .values()
            .filter(|s| s.last_activity.elapsed() > self.session_timeout)
            .map(|s| s.client_id.clone())
            .collect()
    }

    pub fn snapshot(&self) -> Vec<SessionSnapshot> {
        self.sessions
            .read()
            .expect("session lock poisoned")
            .values()
            .map(|s| SessionSnapshot {
                client_id: s.client_id.clone(),
                server_id: s.server_id.clone(),
                idle_ms: s.last_activity.elapsed().as_millis() as u64,
            })
            .collect()
    }
}

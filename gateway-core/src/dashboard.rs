//! Dashboard operator sessions (spec §3 `DashboardSession`, §4.7 `/api/login`
//! and `/api/logout`).
//!
//! Same `RwLock<HashMap>` shape as `fleet.rs`/`sessions.rs`, with a sliding
//! expiry on top — grounded on the same `Registry` lineage, generalized here
//! to a token store instead of a refcount map.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use uuid::Uuid;

struct DashboardSession {
    last_seen: Instant,
}

impl DashboardSession {
    fn is_expired(&self, idle_timeout: Duration) -> bool {
        self.last_seen.elapsed() > idle_timeout
    }
}

/// Token store for logged-in dashboard operators. Spec §3 models a session
/// as a single `token -> expiresAt`, extended on every successful
/// `/api/stats` call — there is no separate hard ceiling from issuance, an
/// operator who keeps polling stays logged in indefinitely.
pub struct DashboardSessions {
    sessions: RwLock<HashMap<String, DashboardSession>>,
    idle_timeout: Duration,
}

impl DashboardSessions {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
        }
    }

    /// Mints a fresh token after a successful `/api/login`.
    pub fn issue(&self) -> String {
        let token = format!("dash-{}", Uuid::new_v4());
        self.sessions.write().expect("dashboard lock poisoned").insert(
            token.clone(),
            DashboardSession {
                last_seen: Instant::now(),
            },
        );
        token
    }

    /// Validates `token`, refreshing its sliding window on success. Returns
    /// `false` for an unknown or expired token (caller should respond 401).
    pub fn touch(&self, token: &str) -> bool {
        let mut sessions = self.sessions.write().expect("dashboard lock poisoned");
        match sessions.get_mut(token) {
            Some(session) if !session.is_expired(self.idle_timeout) => {
                session.last_seen = Instant::now();
                true
            }
            Some(_) => {
                sessions.remove(token);
                false
            }
            None => false,
        }
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.sessions
            .write()
            .expect("dashboard lock poisoned")
            .remove(token)
            .is_some()
    }

    /// Sweeps every token past its idle window. Run from the same periodic
    /// sweep as the session-table reaper.
    pub fn sweep_expired(&self) {
        let mut sessions = self.sessions.write().expect("dashboard lock poisoned");
        sessions.retain(|_, session| !session.is_expired(self.idle_timeout));
    }

    pub fn len(&self) -> usize {
        self.sessions.read().expect("dashboard lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_validates() {
        let store = DashboardSessions::new(Duration::from_secs(60));
        let token = store.issue();
        assert!(store.touch(&token));
    }

    #[test]
    fn unknown_token_rejected() {
        let store = DashboardSessions::new(Duration::from_secs(60));
        assert!(!store.touch("nope"));
    }

    #[test]
    fn revoke_invalidates_token() {
        let store = DashboardSessions::new(Duration::from_secs(60));
        let token = store.issue();
        assert!(store.revoke(&token));
        assert!(!store.touch(&token));
    }

    #[test]
    fn idle_timeout_expires_token() {
        let store = DashboardSessions::new(Duration::from_millis(1));
        let token = store.issue();
        std::thread::sleep(Duration::from_millis(5));
        assert!(!store.touch(&token));
    }

    #[test]
    fn sweep_removes_expired_tokens() {
        let store = DashboardSessions::new(Duration::from_millis(1));
        store.issue();
        std::thread::sleep(Duration::from_millis(5));
        store.sweep_expired();
        assert!(store.is_empty());
    }
}

//! C3 — Assignment policy, and the `GetServerForClient` orchestration that
//! ties C1 (fleet) and C2 (sessions) together (spec §4.2).
//!
//! The round-robin cursor is a single process-wide `AtomicUsize`, the same
//! lock-free-counter shape `titanium-gateway::heartbeat::HeartbeatHandler`
//! uses for its RTT/interval bookkeeping — the teacher itself (`ckir-rsdev`)
//! has no atomic-counter precedent, all of its shared mutable state goes
//! through a `Mutex`, but a monotonic cursor read modulo a snapshot length
//! is the textbook case for a lock-free counter and the spec explicitly
//! tolerates a stale modulus (§5).

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::fleet::{Fleet, GameServer};
use crate::sessions::SessionTable;

/// Round-robin selector over a healthy-server snapshot (spec §4.2 step 3).
///
/// Config exposes a `"least-connections"` policy name, but the shipped
/// behavior is round-robin regardless of that setting (spec §4.2) — this
/// type intentionally has no policy parameter.
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self {
            cursor: AtomicUsize::new(0),
        }
    }

    /// Picks the next server from `healthy` by cursor order. A stale
    /// cursor (if the healthy set shrank since the last call) just wraps
    /// via modulo — no special handling needed, the next call
    /// self-corrects (spec §5).
    pub fn select_next<'a>(&self, healthy: &'a [GameServer]) -> Option<&'a GameServer> {
        if healthy.is_empty() {
            return None;
        }
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % healthy.len();
        healthy.get(idx)
    }
}

impl Default for RoundRobin {
    fn default() -> Self {
        Self::new()
    }
}

/// Implements spec §4.2's `GetServerForClient(clientId) -> GameServer | null`.
///
/// Returns the assigned server, or `None` if no server currently has spare
/// capacity.
pub fn get_server_for_client(
    fleet: &Fleet,
    sessions: &SessionTable,
    policy: &RoundRobin,
    client_id: &str,
) -> Option<GameServer> {
    if let Some(server_id) = sessions.touch(client_id) {
        if let Some(server) = fleet.get(&server_id) {
            if fleet.is_healthy(&server) {
                return Some(server);
            }
        }
        // Dangling pointer: server gone or full. Fall through to reassignment.
        sessions.remove(client_id);
    }

    let healthy = fleet.healthy_snapshot();
    let chosen = policy.select_next(&healthy)?.clone();
    sessions.bind(client_id, &chosen.id);
    Some(chosen)
}

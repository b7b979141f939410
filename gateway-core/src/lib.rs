//! Shared coordination state for the gateway: fleet registry, session table,
//! assignment policy, migration engine, dashboard sessions and config.
//!
//! Mirrors the teacher's `yahoo_logic::state::AppState` design note — rather
//! than threading four separate `Arc`s through every handler, this crate
//! bundles them into one [`Coordinator`] and hands callers an `Arc<Coordinator>`.

pub mod assignment;
pub mod backpressure;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod fleet;
pub mod migration;
pub mod sessions;

pub use assignment::{get_server_for_client, RoundRobin};
pub use backpressure::ConnectionBudget;
pub use config::GatewayConfig;
pub use dashboard::DashboardSessions;
pub use error::GatewayError;
pub use fleet::{Fleet, GameServer, HeartbeatUpdate, Registration};
pub use migration::{MigrationEngine, MigrationOutcome, MigrationRecord};
pub use sessions::{ClientSession, SessionTable};

/// Owned state passed explicitly to every handler, per the design note in
/// spec §9: "model them as owned state inside a single coordinator value."
pub struct Coordinator {
    pub config: GatewayConfig,
    pub fleet: Fleet,
    pub sessions: SessionTable,
    pub policy: RoundRobin,
    pub migrations: MigrationEngine,
    pub dashboard: DashboardSessions,
}

impl Coordinator {
    pub fn new(config: GatewayConfig) -> Self {
        let fleet = Fleet::new(config.server_timeout);
        let sessions = SessionTable::new(config.session_timeout);
        let dashboard = DashboardSessions::new(config::DASHBOARD_SESSION_TIMEOUT);
        Self {
            config,
            fleet,
            sessions,
            policy: RoundRobin::new(),
            migrations: MigrationEngine::new(),
            dashboard,
        }
    }

    /// Assigns (or re-confirms) a server for `client_id`, per spec §4.2.
    pub fn assign(&self, client_id: &str) -> Option<GameServer> {
        get_server_for_client(&self.fleet, &self.sessions, &self.policy, client_id)
    }

    /// Runs the full dead-server sweep for one tick: every expired server is
    /// migrated then evicted (spec §4.4).
    pub fn sweep_dead_servers(&self) -> Vec<(String, MigrationOutcome)> {
        let mut results = Vec::new();
        for id in self.fleet.expired_ids() {
            let outcome = self
                .migrations
                .migrate_away_from(&self.fleet, &self.sessions, &self.policy, &id);
            self.fleet.remove(&id);
            tracing::info!(server_id = %id, "evicted dead server after migration sweep");
            results.push((id, outcome));
        }
        results
    }

    /// Deletes every idle-expired client session (spec §4.4).
    pub fn sweep_expired_sessions(&self) -> usize {
        let expired = self.sessions.expired_ids();
        for id in &expired {
            self.sessions.remove(id);
        }
        expired.len()
    }
}

//! C4 — Migration engine: re-homes every session pinned to a server that is
//! leaving the fleet (spec §4.3).
//!
//! Grounded on `lib_common::core::dispatcher::Dispatcher::broadcast`'s
//! "collect affected, act on each, retain survivors" shape, and on
//! `enforce_eviction`'s bounded-history-ring bookkeeping, generalized here
//! from an eviction log to a migration log.

use std::collections::{HashSet, VecDeque};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::assignment::RoundRobin;
use crate::fleet::Fleet;
use crate::sessions::SessionTable;

/// Longest the in-memory migration ring keeps (spec §4.3: "the most recent
/// 100 migrations").
const HISTORY_CAP: usize = 100;

/// One migration event — the fan-out of every session pinned to a single
/// departing server (spec §3 `MigrationRecord`). `to_server` is a single id
/// when the clients landed on one healthy target, or a `"<k> servers"`
/// summary when they fanned out across more than one (spec §4.3 step 6).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationRecord {
    pub from_server: String,
    pub to_server: String,
    pub client_count: usize,
    pub migrated_at_ms_ago: u64,
}

struct HistoryEntry {
    from_server: String,
    to_server: String,
    client_count: usize,
    at: Instant,
}

/// Outcome of migrating every client off a departing server.
#[derive(Debug, Default)]
pub struct MigrationOutcome {
    pub migrated: usize,
    pub stranded: usize,
}

pub struct MigrationEngine {
    history: RwLock<VecDeque<HistoryEntry>>,
    total_migrations: RwLock<u64>,
}

impl MigrationEngine {
    pub fn new() -> Self {
        Self {
            history: RwLock::new(VecDeque::with_capacity(HISTORY_CAP)),
            total_migrations: RwLock::new(0),
        }
    }

    /// Implements spec §4.3's migration procedure for a single departing
    /// server: collects its clients, and either strands all of them (no
    /// healthy target exists — spec §4.3 step 4, scenario 4: no record,
    /// `totalMigrations` unchanged) or round-robins every one of them
    /// across the remaining healthy fleet and appends a single
    /// `MigrationRecord` for the whole event (spec §4.3 step 6).
    pub fn migrate_away_from(
        &self,
        fleet: &Fleet,
        sessions: &SessionTable,
        policy: &RoundRobin,
        departing_server_id: &str,
    ) -> MigrationOutcome {
        let affected = sessions.clients_of(departing_server_id);
        let mut outcome = MigrationOutcome::default();

        if affected.is_empty() {
            return outcome;
        }

        let healthy = fleet.healthy_snapshot();

        if healthy.is_empty() {
            for client_id in &affected {
                sessions.remove(client_id);
            }
            outcome.stranded = affected.len();
            tracing::warn!(
                server_id = %departing_server_id,
                stranded = outcome.stranded,
                "migration found no healthy targets, sessions dropped"
            );
            return outcome;
        }

        let mut targets_used = HashSet::new();
        for (i, client_id) in affected.iter().enumerate() {
            // Round-robin across the departing server's replacements the
            // same way C3 does for fresh assignment (spec §4.3 step 5:
            // "i mod healthy.len()"), but via the shared cursor so ongoing
            // fresh assignments and migrations don't pile onto one server.
            let target = policy.select_next(&healthy).unwrap_or(&healthy[i % healthy.len()]);
            sessions.bind(client_id, &target.id);
            targets_used.insert(target.id.clone());
        }
        outcome.migrated = affected.len();

        let to_server = if targets_used.len() == 1 {
            targets_used.into_iter().next().expect("exactly one target")
        } else {
            format!("{} servers", targets_used.len())
        };
        self.record(departing_server_id, &to_server, outcome.migrated);

        tracing::info!(
            server_id = %departing_server_id,
            migrated = outcome.migrated,
            to_server = %to_server,
            "migrated sessions off departing server"
        );

        outcome
    }

    fn record(&self, from: &str, to: &str, client_count: usize) {
        let mut history = self.history.write().expect("history lock poisoned");
        if history.len() == HISTORY_CAP {
            history.pop_front();
        }
        history.push_back(HistoryEntry {
            from_server: from.to_string(),
            to_server: to.to_string(),
            client_count,
            at: Instant::now(),
        });
        *self.total_migrations.write().expect("counter lock poisoned") += client_count as u64;
    }

    pub fn total_migrations(&self) -> u64 {
        *self.total_migrations.read().expect("counter lock poisoned")
    }

    /// Most recent migration events, newest last (spec §6 dashboard feed).
    pub fn recent(&self) -> Vec<MigrationRecord> {
        self.history
            .read()
            .expect("history lock poisoned")
            .iter()
            .map(|e| MigrationRecord {
                from_server: e.from_server.clone(),
                to_server: e.to_server.clone(),
                client_count: e.client_count,
                migrated_at_ms_ago: e.at.elapsed().as_millis() as u64,
            })
            .collect()
    }
}

impl Default for MigrationEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::Registration;

    fn fleet_with(ids: &[&str]) -> Fleet {
        let fleet = Fleet::new(Duration::from_secs(30));
        for id in ids {
            fleet
                .register(Registration {
                    id: id.to_string(),
                    host: format!("{id}host"),
                    public_host: None,
                    port: 80,
                    ws_port: 81,
                    max_connections: 100,
                })
                .unwrap();
        }
        fleet
    }

    #[test]
    fn migrating_with_no_affected_clients_is_a_noop() {
        let fleet = fleet_with(&["s1", "s2"]);
        let sessions = SessionTable::new(Duration::from_secs(60));
        let policy = RoundRobin::new();
        let engine = MigrationEngine::new();
        let outcome = engine.migrate_away_from(&fleet, &sessions, &policy, "s1");
        assert_eq!(outcome.migrated, 0);
        assert_eq!(outcome.stranded, 0);
    }

    #[test]
    fn migrates_clients_to_remaining_healthy_server() {
        let fleet = fleet_with(&["s1", "s2"]);
        let sessions = SessionTable::new(Duration::from_secs(60));
        sessions.bind("c1", "s1");
        sessions.bind("c2", "s1");
        fleet.remove("s1");
        let policy = RoundRobin::new();
        let engine = MigrationEngine::new();
        let outcome = engine.migrate_away_from(&fleet, &sessions, &policy, "s1");
        assert_eq!(outcome.migrated, 2);
        assert_eq!(sessions.get("c1").unwrap().server_id, "s2");
        assert_eq!(sessions.get("c2").unwrap().server_id, "s2");
        assert_eq!(engine.total_migrations(), 2);

        // A single healthy target -> one MigrationRecord, toServer is its
        // bare id (not a "<k> servers" summary), clientCount is 2 (spec §8
        // scenario 3).
        let recent = engine.recent();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].from_server, "s1");
        assert_eq!(recent[0].to_server, "s2");
        assert_eq!(recent[0].client_count, 2);
    }

    #[test]
    fn migration_fans_out_across_multiple_healthy_targets_with_summary() {
        let fleet = fleet_with(&["s1", "s2", "s3"]);
        let sessions = SessionTable::new(Duration::from_secs(60));
        sessions.bind("c1", "s1");
        sessions.bind("c2", "s1");
        sessions.bind("c3", "s1");
        fleet.remove("s1");
        let policy = RoundRobin::new();
        let engine = MigrationEngine::new();
        let outcome = engine.migrate_away_from(&fleet, &sessions, &policy, "s1");
        assert_eq!(outcome.migrated, 3);

        let recent = engine.recent();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].client_count, 3);
        assert_eq!(recent[0].to_server, "2 servers");
    }

    #[test]
    fn migration_with_no_healthy_targets_strands_clients_and_records_nothing() {
        let fleet = Fleet::new(Duration::from_secs(30));
        let sessions = SessionTable::new(Duration::from_secs(60));
        sessions.bind("c1", "s1");
        let policy = RoundRobin::new();
        let engine = MigrationEngine::new();
        let outcome = engine.migrate_away_from(&fleet, &sessions, &policy, "s1");
        assert_eq!(outcome.stranded, 1);
        assert!(sessions.get("c1").is_none());
        // Spec §8 scenario 4: totalMigrations unchanged, nothing recorded.
        assert!(engine.recent().is_empty());
        assert_eq!(engine.total_migrations(), 0);
    }

    #[test]
    fn history_ring_caps_at_100_events() {
        let fleet = fleet_with(&["s1", "s2"]);
        let sessions = SessionTable::new(Duration::from_secs(60));
        let policy = RoundRobin::new();
        let engine = MigrationEngine::new();
        for i in 0..150 {
            let departing = format!("dead-{i}");
            sessions.bind(&format!("c{i}"), &departing);
            engine.migrate_away_from(&fleet, &sessions, &policy, &departing);
        }
        assert_eq!(engine.recent().len(), HISTORY_CAP);
        assert_eq!(engine.total_migrations(), 150);
    }
}

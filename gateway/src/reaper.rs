//! C5 — Reaper: the two periodic sweeps (spec §4.4).
//!
//! Grounded on `yahoo_logic::monitor::run`'s `interval` + `select!` +
//! shutdown-broadcast shape, split into two independent tasks since the
//! spec calls for two independently-scheduled sweeps rather than one.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::interval;

use gateway_core::Coordinator;

/// Expired-session sweep interval (spec §4.4: "runs every 60 s").
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub async fn run_dead_server_sweep(coordinator: Arc<Coordinator>, mut shutdown: broadcast::Receiver<()>) {
    let mut tick = interval(coordinator.config.heartbeat_interval);
    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("dead-server sweep shutting down");
                break;
            }
            _ = tick.tick() => {
                // `Coordinator::sweep_dead_servers` already warn-logs any
                // stranded migration from inside `MigrationEngine::migrate_away_from`.
                coordinator.sweep_dead_servers();
            }
        }
    }
}

pub async fn run_session_sweep(coordinator: Arc<Coordinator>, mut shutdown: broadcast::Receiver<()>) {
    let mut tick = interval(SESSION_SWEEP_INTERVAL);
    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("session sweep shutting down");
                break;
            }
            _ = tick.tick() => {
                let expired = coordinator.sweep_expired_sessions();
                if expired > 0 {
                    tracing::debug!(expired, "swept idle sessions");
                }
                coordinator.dashboard.sweep_expired();
            }
        }
    }
}

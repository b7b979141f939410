//! Gateway entry point: config load, coordinator construction, reaper
//! tasks, and the two listeners (admin/proxy HTTP, control-plane WS).
//!
//! Bootstrap sequence and shutdown wiring follow `server_yahoo.rs`'s
//! `main`: a `broadcast` shutdown channel fanned out to every spawned task,
//! `tokio::try_join!` on the handles, ctrl_c/SIGTERM on the select.

use std::sync::Arc;

use clap::Parser;
use tokio::signal;

use gateway::reaper;
use gateway_core::{Coordinator, GatewayConfig};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Matchmaking gateway and reverse proxy")]
struct Cli {
    /// Path to an optional JSON config file (see spec §3 `Configuration`).
    #[clap(long, env = "GATEWAY_CONFIG_PATH")]
    config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let _ = rustls::crypto::ring::default_provider().install_default();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = GatewayConfig::load(cli.config.as_deref());
    let coordinator = Arc::new(Coordinator::new(config));

    let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);

    let dead_server_sweep = tokio::spawn(reaper::run_dead_server_sweep(
        coordinator.clone(),
        shutdown_tx.subscribe(),
    ));
    let session_sweep = tokio::spawn(reaper::run_session_sweep(
        coordinator.clone(),
        shutdown_tx.subscribe(),
    ));

    let http_handle = tokio::spawn(gateway::run_http_listener(coordinator.clone(), shutdown_tx.subscribe()));
    let ws_handle = tokio::spawn(gateway::run_ws_listener(coordinator.clone(), shutdown_tx.subscribe()));

    wait_for_shutdown_signal().await;
    tracing::info!("shutdown signal received, stopping services");
    let _ = shutdown_tx.send(());

    let _ = tokio::try_join!(dead_server_sweep, session_sweep, http_handle, ws_handle);
    tracing::info!("shutdown complete");
    Ok(())
}

async fn wait_for_shutdown_signal() {
    tokio::select! {
        _ = signal::ctrl_c() => {
            tracing::info!("ctrl-c received");
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut term = signal::unix::signal(signal::unix::SignalKind::terminate()).expect("failed to install SIGTERM handler");
                term.recv().await;
                tracing::info!("SIGTERM received");
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {}
    }
}

//! TLS/plain transport binding (spec §4.8, C9).
//!
//! Grounded on `yahoo_logic::downstream::run`'s `if let (Some(cert), Some(key))`
//! bind-with-fallback shape, swapped from a single listener to the gateway's
//! two independent listeners (HTTP admin/proxy, WS control-plane).

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use tokio::sync::broadcast;

use gateway_core::config::TlsConfig;

/// Grace period `axum_server::Handle::graceful_shutdown` allows in-flight
/// connections before forcing the TLS listener closed.
const TLS_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Serves `app` on `addr`, using `tls` if present, falling back to plain
/// `axum::serve` otherwise. Shared by both the admin/proxy HTTP listener and
/// the WS control-plane listener since both bind the same way.
pub async fn serve(
    app: Router,
    addr: SocketAddr,
    tls: Option<&TlsConfig>,
    mut shutdown: broadcast::Receiver<()>,
    label: &str,
) -> anyhow::Result<()> {
    if let Some(tls) = tls {
        let rustls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path).await?;
        tracing::info!(%addr, listener = label, "binding TLS listener");

        // `axum_server::serve` has no `with_graceful_shutdown` like plain
        // `axum::serve`; a `Handle` is the equivalent wired through
        // `.handle(...)`, triggered from a task watching the same shutdown
        // broadcast the plain branch awaits inline.
        let handle = Handle::new();
        let shutdown_handle = handle.clone();
        let label = label.to_string();
        tokio::spawn(async move {
            shutdown.recv().await.ok();
            tracing::info!(listener = %label, "listener shutting down");
            shutdown_handle.graceful_shutdown(Some(TLS_SHUTDOWN_GRACE));
        });

        axum_server::bind_rustls(addr, rustls_config)
            .handle(handle)
            .serve(app.into_make_service())
            .await?;
    } else {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(%addr, listener = label, "binding plain listener");
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.recv().await.ok();
                tracing::info!(listener = label, "listener shutting down");
            })
            .await?;
    }
    Ok(())
}

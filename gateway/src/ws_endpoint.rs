//! C6 — Control WebSocket endpoint (spec §4.5).
//!
//! Grounded on `yahoo_logic::downstream::ws_handler`/`handle_socket`'s
//! upgrade-then-spawn shape, replacing its pricing-subscription protocol
//! with a single one-shot assignment frame and no further message handling.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use uuid::Uuid;

use gateway_core::backpressure::{ConnectionBudget, SendOutcome};
use gateway_core::backpressure::retry_delay;
use gateway_core::Coordinator;

use crate::models::{AssignmentFrame, AssignmentTarget, ErrorFrame};

#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    #[serde(rename = "clientId")]
    client_id: Option<String>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<ConnectQuery>,
    State(coordinator): State<Arc<Coordinator>>,
) -> impl IntoResponse {
    let client_id = query
        .client_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| format!("client-{}", Uuid::new_v4()));

    ws.on_upgrade(move |socket| handle_socket(socket, coordinator, client_id))
}

async fn handle_socket(mut socket: WebSocket, coordinator: Arc<Coordinator>, client_id: String) {
    tracing::info!(%client_id, "control connection opened");
    let budget = ConnectionBudget::new(coordinator.config.max_buffer_size);

    match coordinator.assign(&client_id) {
        Some(server) => {
            let frame = AssignmentFrame {
                client_id: client_id.clone(),
                server: AssignmentTarget {
                    host: server.public_host.clone(),
                    port: server.port,
                    ws_port: server.ws_port,
                },
            };
            send_with_backpressure(&mut socket, &budget, &frame).await;
        }
        None => {
            let frame = ErrorFrame {
                message: "No available servers".to_string(),
            };
            send_with_backpressure(&mut socket, &budget, &frame).await;
            tokio::time::sleep(Duration::from_millis(100)).await;
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    }

    // Spec §4.5 step 5: the control plane never proxies subsequent frames.
    // Any inbound message is logged and ignored; the client is expected to
    // disconnect and reconnect directly to the advertised data-plane endpoint.
    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Close(_) => break,
            other => tracing::warn!(%client_id, frame = ?other, "unexpected inbound frame on control plane, ignoring"),
        }
    }

    tracing::info!(%client_id, "control connection closed");
    // The session in C2 is intentionally left intact (spec §4.5 "on close").
}

/// Serializes `frame` and sends it, honoring the backpressure discipline of
/// spec §4.5: retry on overflow with the linear-capped backoff, give up
/// silently after `MAX_ATTEMPTS`.
async fn send_with_backpressure<T: serde::Serialize>(
    socket: &mut WebSocket,
    budget: &ConnectionBudget,
    frame: &T,
) {
    let payload = match serde_json::to_string(frame) {
        Ok(p) => p,
        Err(err) => {
            tracing::error!(%err, "failed to serialize outbound control frame");
            return;
        }
    };
    let len = payload.len() as u64;

    loop {
        match budget.try_reserve(len) {
            Ok(()) => {
                budget.reserve(len);
                if socket.send(Message::Text(payload.into())).await.is_err() {
                    tracing::debug!("control send failed, socket likely closed");
                }
                budget.release(len);
                return;
            }
            Err(SendOutcome::Retry) => {
                let attempt = budget.current_attempt();
                tokio::time::sleep(retry_delay(attempt)).await;
            }
            Err(SendOutcome::Exhausted) => {
                tracing::warn!("backpressure retries exhausted, dropping control frame");
                return;
            }
        }
    }
}

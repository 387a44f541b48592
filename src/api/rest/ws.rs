use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::api::rest::identity::ActorId;
use crate::state::AppState;

/// Streams the caller's notifications as JSON text frames.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ActorId(actor_id): ActorId,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, actor_id))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, actor_id: String) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.notifications.subscribe();

    info!(actor_id = %actor_id, "notification subscriber connected");

    let target = actor_id.clone();
    let send_task = tokio::spawn(async move {
        loop {
            let notification = match rx.recv().await {
                Ok(notification) => notification,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(actor_id = %target, skipped, "notification subscriber lagged");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            if notification.target_id != target {
                continue;
            }

            let json = match serde_json::to_string(&notification) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize notification for ws");
                    continue;
                }
            };

            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    info!(actor_id = %actor_id, "notification subscriber disconnected");
}

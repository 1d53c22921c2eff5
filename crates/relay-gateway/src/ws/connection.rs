use axum::{
    extract::{ws::Message, ws::WebSocket, State, WebSocketUpgrade},
    response::IntoResponse,
};
use futures_util::StreamExt;
use relay_core::ConnId;
use relay_hub::{Connection, DisconnectReason};
use relay_protocol::frames::ServerFrame;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::app::AppState;
use crate::ws::{handshake, message, send, send::WsConnection};

/// Axum handler — upgrades HTTP to WebSocket at GET /ws.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| run_connection(socket, state))
}

/// Per-connection event loop — lives for the entire WS session.
///
/// Awaiting join → registered with the hub → deregistered. Only the middle
/// phase is visible to other clients.
async fn run_connection(socket: WebSocket, state: Arc<AppState>) {
    let conn_id = ConnId::new();
    info!(conn_id = %conn_id, "new WS connection");

    let (mut tx, mut rx) = socket.split();
    let limits = &state.config.relay;
    let send_timeout = Duration::from_millis(limits.send_timeout_ms);

    let joined = tokio::select! {
        result = handshake::await_join(&mut rx, limits) => result,
        _ = state.shutdown.cancelled() => return,
    };
    let username = match joined {
        Ok(name) => name,
        Err(e) => {
            warn!(conn_id = %conn_id, error = %e, "join rejected");
            send::reject(&mut tx, &ServerFrame::error(e.code(), e.to_string()), send_timeout).await;
            return;
        }
    };

    let conn = Arc::new(WsConnection::new(conn_id, username, tx, send_timeout));
    if let Err(e) = state.hub.on_connected(conn.clone()).await {
        warn!(conn_id = %conn.id(), error = %e, "registration failed");
        conn.close(None).await;
        return;
    }

    let mut last_frame = None;
    let reason = loop {
        tokio::select! {
            msg = rx.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    if text.len() > limits.max_message_bytes {
                        warn!(conn_id = %conn.id(), size = text.len(), "payload too large");
                        last_frame = Some(ServerFrame::error(
                            "PAYLOAD_TOO_LARGE",
                            format!("message exceeds {} bytes", limits.max_message_bytes),
                        ));
                        break DisconnectReason::PayloadTooLarge {
                            size: text.len(),
                            max: limits.max_message_bytes,
                        };
                    }
                    message::handle(&conn, text.as_str(), &state).await;
                }
                Some(Ok(Message::Ping(data))) => {
                    if let Err(e) = conn.send_control(Message::Pong(data)).await {
                        break DisconnectReason::Transport(e.to_string());
                    }
                }
                Some(Ok(Message::Close(_))) | None => break DisconnectReason::ClientClosed,
                Some(Err(e)) => break DisconnectReason::Transport(e.to_string()),
                _ => {}
            },

            _ = state.shutdown.cancelled() => break DisconnectReason::Shutdown,
        }
    };

    conn.mark_closed();
    state.hub.on_disconnected(&*conn, reason).await;
    conn.close(last_frame.as_ref()).await;
    info!(conn_id = %conn.id(), "WS connection closed");
}

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{stream::SplitStream, StreamExt};
use relay_core::{config::RelayLimits, RelayError};
use relay_protocol::{frames::ClientFrame, handshake::validate_username};

pub type WsStream = SplitStream<WebSocket>;

/// Wait for the client's `join` frame and return the validated username.
///
/// The first text frame must be a `join`; anything else, a bad name, or no
/// join within `join_timeout_ms` rejects the connection.
pub async fn await_join(rx: &mut WsStream, limits: &RelayLimits) -> Result<String, RelayError> {
    let deadline = Duration::from_millis(limits.join_timeout_ms);
    match tokio::time::timeout(deadline, read_join(rx, limits)).await {
        Ok(result) => result,
        Err(_) => Err(RelayError::JoinTimeout {
            ms: limits.join_timeout_ms,
        }),
    }
}

async fn read_join(rx: &mut WsStream, limits: &RelayLimits) -> Result<String, RelayError> {
    while let Some(msg) = rx.next().await {
        match msg.map_err(|e| RelayError::Protocol(e.to_string()))? {
            Message::Text(text) => {
                if text.len() > limits.max_message_bytes {
                    return Err(RelayError::PayloadTooLarge {
                        size: text.len(),
                        max: limits.max_message_bytes,
                    });
                }
                return match serde_json::from_str::<ClientFrame>(text.as_str())? {
                    ClientFrame::Join { username } => {
                        validate_username(&username, limits.max_username_len)
                    }
                    ClientFrame::Message { .. } => Err(RelayError::Protocol(
                        "join required before sending messages".to_string(),
                    )),
                };
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    Err(RelayError::Protocol(
        "connection closed before join".to_string(),
    ))
}

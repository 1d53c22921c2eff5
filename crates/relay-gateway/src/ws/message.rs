use relay_hub::Connection;
use relay_protocol::frames::ClientFrame;
use tracing::{debug, warn};

use crate::app::AppState;
use crate::ws::send::WsConnection;

/// Process one inbound text frame from a joined client.
pub async fn handle(conn: &WsConnection, text: &str, app: &AppState) {
    let frame: ClientFrame = match serde_json::from_str(text) {
        Ok(f) => f,
        Err(e) => {
            warn!(conn_id = %conn.id(), error = %e, "malformed frame");
            return;
        }
    };

    match frame {
        ClientFrame::Message { message } => {
            if message.is_empty() {
                debug!(conn_id = %conn.id(), "empty message ignored");
                return;
            }
            let report = app.hub.on_message(conn, &message).await;
            debug!(
                conn_id = %conn.id(),
                delivered = report.delivered,
                failed = report.failed,
                "message relayed"
            );
        }
        ClientFrame::Join { .. } => {
            warn!(conn_id = %conn.id(), "repeated join ignored");
        }
    }
}

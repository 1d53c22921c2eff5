use std::sync::Arc;
use std::time::Duration;

use relay_core::config::RelayLimits;
use relay_core::types::SERVER_SENDER;
use relay_core::ConnId;
use relay_protocol::frames::{ChatFrame, HistoryEntry, ServerFrame};
use tracing::{debug, error, info, instrument};

use crate::broadcast::{BroadcastReport, Broadcaster};
use crate::connection::{Connection, DisconnectReason};
use crate::error::{HubError, Result};
use crate::history::History;
use crate::registry::Registry;

/// Entry point the transport drives: one call per connect, message and
/// disconnect event.
///
/// Every relayed line goes to all registered connections, the sender
/// included, and is appended to the in-memory history.
pub struct RelayHub {
    broadcaster: Broadcaster,
    history: History,
    history_replay: usize,
}

impl RelayHub {
    pub fn new(limits: &RelayLimits) -> Self {
        Self::with_registry(Arc::new(Registry::new()), limits)
    }

    pub fn with_registry(registry: Arc<Registry>, limits: &RelayLimits) -> Self {
        Self {
            broadcaster: Broadcaster::new(
                registry,
                Duration::from_millis(limits.send_timeout_ms),
            ),
            history: History::new(limits.history_capacity),
            history_replay: limits.history_replay,
        }
    }

    pub fn registry(&self) -> &Registry {
        self.broadcaster.registry()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Register a joined connection, replay recent history to it and announce
    /// it to everyone.
    ///
    /// A duplicate id leaves the existing registration in place and returns
    /// [`HubError::DuplicateId`]; the caller should close the newcomer.
    #[instrument(skip_all, fields(conn_id = %conn.id(), username = conn.username()))]
    pub async fn on_connected(&self, conn: Arc<dyn Connection>) -> Result<BroadcastReport> {
        // Replay and registration happen under the history lock, so a
        // concurrent relay lands either in the replay or in the live stream.
        let (data, added) = self.history.recent_then(self.history_replay, || {
            self.registry().add(conn.id().clone(), Arc::clone(&conn))
        });
        added?;

        let replay = ServerFrame::History { data };
        if let Some(payload) = encode(&replay) {
            if let Err(source) = self.broadcaster.send_to(&conn, &payload).await {
                return Err(HubError::Send {
                    id: conn.id().clone(),
                    source,
                });
            }
        }

        info!(clients = self.registry().len(), "client joined");
        Ok(self
            .announce(format!("{} joined the chat!", conn.username()))
            .await)
    }

    /// Relay one inbound line from `conn` to every registered connection.
    #[instrument(skip_all, fields(conn_id = %conn.id(), username = conn.username()))]
    pub async fn on_message(&self, conn: &dyn Connection, payload: &str) -> BroadcastReport {
        debug!(bytes = payload.len(), "relaying message");
        self.relay(conn.username(), payload).await
    }

    /// Deregister `conn`. Returns the leave announcement's report, or `None`
    /// when the connection had already been pruned by a failed send.
    #[instrument(skip_all, fields(conn_id = %conn.id(), username = conn.username()))]
    pub async fn on_disconnected(
        &self,
        conn: &dyn Connection,
        reason: DisconnectReason,
    ) -> Option<BroadcastReport> {
        if !self.registry().remove(conn.id()) {
            debug!(%reason, "disconnect for unregistered connection ignored");
            return None;
        }
        info!(%reason, clients = self.registry().len(), "client left");
        Some(
            self.announce(format!("{} left the chat!", conn.username()))
                .await,
        )
    }

    /// Forget every connection. In-flight broadcasts keep their snapshots and
    /// finish on their own.
    pub fn shutdown(&self) -> Vec<ConnId> {
        let dropped = self.registry().clear();
        info!(dropped = dropped.len(), "relay hub shut down");
        dropped
    }

    async fn announce(&self, text: String) -> BroadcastReport {
        self.relay(SERVER_SENDER, &text).await
    }

    async fn relay(&self, sender: &str, message: &str) -> BroadcastReport {
        let frame = ServerFrame::from(ChatFrame::new(sender, message));
        let Some(payload) = encode(&frame) else {
            return BroadcastReport::default();
        };
        let targets = self
            .history
            .push_then(HistoryEntry::new(sender, message), || {
                self.registry().snapshot()
            });
        self.broadcaster.broadcast_to(targets, &payload).await
    }
}

fn encode(frame: &ServerFrame) -> Option<String> {
    match frame.to_json() {
        Ok(json) => Some(json),
        Err(e) => {
            error!(error = %e, "failed to serialize server frame");
            None
        }
    }
}

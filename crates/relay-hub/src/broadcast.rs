use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use relay_core::ConnId;
use tracing::{debug, warn};

use crate::connection::Connection;
use crate::error::SendError;
use crate::registry::Registry;

/// Outcome of one fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
    /// Connections removed from the registry because their send failed.
    pub pruned: Vec<ConnId>,
}

impl BroadcastReport {
    pub fn attempted(&self) -> usize {
        self.delivered + self.failed
    }
}

/// Fan-out engine over a [`Registry`].
///
/// Each broadcast works on a snapshot taken under the registry lock; sends
/// happen after the lock is released and run concurrently, each bounded by
/// `send_timeout`. A connection that is closed, errors or times out is pruned
/// and never retried within the same broadcast.
pub struct Broadcaster {
    registry: Arc<Registry>,
    send_timeout: Duration,
}

impl Broadcaster {
    pub fn new(registry: Arc<Registry>, send_timeout: Duration) -> Self {
        Self {
            registry,
            send_timeout,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Deliver `payload` to every registered connection, sender included.
    pub async fn broadcast(&self, payload: &str) -> BroadcastReport {
        self.broadcast_to(self.registry.snapshot(), payload).await
    }

    /// Deliver `payload` to a snapshot the caller already took.
    pub async fn broadcast_to(
        &self,
        targets: Vec<Arc<dyn Connection>>,
        payload: &str,
    ) -> BroadcastReport {
        let outcomes = join_all(targets.iter().map(|conn| self.deliver(conn, payload))).await;

        let mut report = BroadcastReport::default();
        for (conn, outcome) in targets.iter().zip(outcomes) {
            match outcome {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    if self.prune(conn, &e) {
                        report.pruned.push(conn.id().clone());
                    }
                }
            }
        }

        debug!(
            delivered = report.delivered,
            failed = report.failed,
            "broadcast complete"
        );
        report
    }

    /// Deliver `payload` to a single connection under the same rules as a
    /// broadcast: closed, failing or slow connections are pruned.
    pub async fn send_to(&self, conn: &Arc<dyn Connection>, payload: &str) -> Result<(), SendError> {
        let outcome = self.deliver(conn, payload).await;
        if let Err(ref e) = outcome {
            self.prune(conn, e);
        }
        outcome
    }

    async fn deliver(&self, conn: &Arc<dyn Connection>, payload: &str) -> Result<(), SendError> {
        if !conn.is_open() {
            return Err(SendError::Closed);
        }
        match tokio::time::timeout(self.send_timeout, conn.send(payload)).await {
            Ok(result) => result,
            Err(_) => Err(SendError::Timeout {
                ms: self.send_timeout.as_millis() as u64,
            }),
        }
    }

    fn prune(&self, conn: &Arc<dyn Connection>, error: &SendError) -> bool {
        let removed = self.registry.remove_if_same(conn);
        if removed {
            warn!(
                conn_id = %conn.id(),
                username = conn.username(),
                error = %error,
                "send failed, connection pruned"
            );
        }
        removed
    }
}

use relay_core::ConnId;
use thiserror::Error;

/// Errors surfaced by the registry and the hub's event handlers.
#[derive(Debug, Error)]
pub enum HubError {
    /// A connect event arrived for an id that is still registered.
    /// The existing registration is kept; the newcomer is rejected.
    #[error("connection already registered: {id}")]
    DuplicateId { id: ConnId },

    /// The initial history replay to a freshly joined connection failed.
    #[error("send to {id} failed: {source}")]
    Send {
        id: ConnId,
        #[source]
        source: SendError,
    },
}

/// Failure to deliver one payload to one connection.
///
/// Always contained by the broadcast engine: the connection is pruned and
/// delivery to everyone else continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    /// The connection reported itself closed before or during the send.
    #[error("connection closed")]
    Closed,

    /// The transport rejected the write.
    #[error("transport error: {0}")]
    Io(String),

    /// The write did not complete within the send timeout.
    #[error("send timed out after {ms}ms")]
    Timeout { ms: u64 },
}

pub type Result<T> = std::result::Result<T, HubError>;

use std::fmt;

use async_trait::async_trait;
use relay_core::ConnId;

use crate::error::SendError;

/// One live client link, as seen by the hub.
///
/// The transport owns the underlying socket. The hub only keeps a shared
/// reference for membership and fan-out, and never opens or closes it.
/// Implementations must serialize concurrent `send` calls themselves:
/// several broadcasts may target the same connection at once.
#[async_trait]
pub trait Connection: Send + Sync {
    fn id(&self) -> &ConnId;

    /// Display name announced with every line this connection sends.
    fn username(&self) -> &str;

    /// Best-effort view of the transport state.
    fn is_open(&self) -> bool;

    async fn send(&self, payload: &str) -> Result<(), SendError>;
}

/// Why the transport tore a connection down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Close frame received or the stream ended.
    ClientClosed,
    /// Read side failed.
    Transport(String),
    /// Inbound frame exceeded the configured limit.
    PayloadTooLarge { size: usize, max: usize },
    /// The server is shutting down.
    Shutdown,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::ClientClosed => write!(f, "client closed"),
            DisconnectReason::Transport(e) => write!(f, "transport error: {e}"),
            DisconnectReason::PayloadTooLarge { size, max } => {
                write!(f, "payload too large ({size} > {max} bytes)")
            }
            DisconnectReason::Shutdown => write!(f, "server shutdown"),
        }
    }
}

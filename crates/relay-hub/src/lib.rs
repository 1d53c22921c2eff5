pub mod broadcast;
pub mod connection;
pub mod error;
pub mod history;
pub mod hub;
pub mod registry;

pub use broadcast::{BroadcastReport, Broadcaster};
pub use connection::{Connection, DisconnectReason};
pub use error::{HubError, SendError};
pub use history::History;
pub use hub::RelayHub;
pub use registry::Registry;

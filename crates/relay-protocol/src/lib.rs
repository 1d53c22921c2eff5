pub mod frames;
pub mod handshake;

pub use frames::{ChatFrame, ClientFrame, HistoryEntry, ServerFrame};

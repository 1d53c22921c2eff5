use serde::{Deserialize, Serialize};

/// Marker placed on every relayed chat frame: the server re-emits the line,
/// clients never talk to each other directly.
pub const ORIGIN_SERVER: &str = "server";

/// Client → Server frame.
/// Wire: `{ "type": "join", "username": "alice" }` or
/// `{ "type": "message", "message": "hi" }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Join { username: String },
    Message { message: String },
}

/// Server → Client frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Recent chat lines, sent once right after a successful join.
    /// Wire: `{ "type": "history", "data": [ {...}, ... ] }`
    History { data: Vec<HistoryEntry> },
    /// One relayed line.
    /// Wire: `{ "type": "message", "origin": "server", "sender": "alice", "message": "hi", "timestamp": "12:00:00" }`
    Message(ChatFrame),
    /// Sent to a single client right before the server closes it.
    /// Wire: `{ "type": "error", "code": "JOIN_TIMEOUT", "message": "..." }`
    Error { code: String, message: String },
}

impl ServerFrame {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatFrame {
    pub origin: String,
    pub sender: String,
    pub message: String,
    /// Local wall-clock time, `HH:MM:SS`.
    pub timestamp: String,
}

impl ChatFrame {
    pub fn new(sender: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            origin: ORIGIN_SERVER.to_string(),
            sender: sender.into(),
            message: message.into(),
            timestamp: chrono::Local::now().format("%H:%M:%S").to_string(),
        }
    }
}

impl From<ChatFrame> for ServerFrame {
    fn from(frame: ChatFrame) -> Self {
        ServerFrame::Message(frame)
    }
}

/// One line of chat history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Local wall-clock time, `YYYY-MM-DD HH:MM:SS`.
    pub timestamp: String,
    pub username: String,
    pub message: String,
}

impl HistoryEntry {
    pub fn new(username: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Local::now()
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            username: username.into(),
            message: message.into(),
        }
    }
}

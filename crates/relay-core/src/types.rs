use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Process-unique identifier for one client connection (UUIDv7 — time-sortable
/// so log lines for the same connection line up chronologically).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnId(pub String);

impl ConnId {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for ConnId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for ConnId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ConnId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Display name used for server-originated chat lines (join/leave notices).
pub const SERVER_SENDER: &str = "SERVER";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_distinct() {
        let a = ConnId::new();
        let b = ConnId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn display_matches_inner_string() {
        let id = ConnId::from("conn-1");
        assert_eq!(id.to_string(), "conn-1");
        assert_eq!(id.as_str(), "conn-1");
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Join timeout after {ms}ms")]
    JoinTimeout { ms: u64 },

    #[error("Invalid username: {reason}")]
    InvalidUsername { reason: String },

    #[error("Payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RelayError {
    /// Short error code string sent to clients in `error` frames.
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::Config(_) => "CONFIG_ERROR",
            RelayError::Protocol(_) => "PROTOCOL_ERROR",
            RelayError::JoinTimeout { .. } => "JOIN_TIMEOUT",
            RelayError::InvalidUsername { .. } => "INVALID_USERNAME",
            RelayError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            RelayError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;

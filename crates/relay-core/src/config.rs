use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 5555;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_SEND_TIMEOUT_MS: u64 = 5_000; // one stalled peer never blocks a broadcast longer than this
pub const DEFAULT_JOIN_TIMEOUT_MS: u64 = 10_000; // close if client doesn't send `join` in 10s
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 64 * 1024;
pub const DEFAULT_HISTORY_CAPACITY: usize = 1_000;
pub const DEFAULT_HISTORY_REPLAY: usize = 50;
pub const DEFAULT_MAX_USERNAME_LEN: usize = 32;

/// Top-level config (relay.toml + RELAY_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub relay: RelayLimits,
}

/// Where the WebSocket gateway listens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

/// Knobs of the broadcast engine and the per-connection session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayLimits {
    /// Upper bound on a single send during a broadcast; a timeout prunes the peer.
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
    #[serde(default = "default_join_timeout_ms")]
    pub join_timeout_ms: u64,
    /// Inbound frames above this size close the connection.
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
    /// Entries kept in the in-memory history ring.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// Entries replayed to a client right after it joins.
    #[serde(default = "default_history_replay")]
    pub history_replay: usize,
    #[serde(default = "default_max_username_len")]
    pub max_username_len: usize,
}

impl Default for RelayLimits {
    fn default() -> Self {
        Self {
            send_timeout_ms: DEFAULT_SEND_TIMEOUT_MS,
            join_timeout_ms: DEFAULT_JOIN_TIMEOUT_MS,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            history_replay: DEFAULT_HISTORY_REPLAY,
            max_username_len: DEFAULT_MAX_USERNAME_LEN,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_send_timeout_ms() -> u64 {
    DEFAULT_SEND_TIMEOUT_MS
}
fn default_join_timeout_ms() -> u64 {
    DEFAULT_JOIN_TIMEOUT_MS
}
fn default_max_message_bytes() -> usize {
    DEFAULT_MAX_MESSAGE_BYTES
}
fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}
fn default_history_replay() -> usize {
    DEFAULT_HISTORY_REPLAY
}
fn default_max_username_len() -> usize {
    DEFAULT_MAX_USERNAME_LEN
}

impl RelayConfig {
    /// Load config from a TOML file with RELAY_* env var overrides.
    ///
    /// Nested keys use a double underscore, e.g. `RELAY_GATEWAY__PORT=6000`
    /// or `RELAY_RELAY__SEND_TIMEOUT_MS=2000`. A missing file is not an
    /// error; every field has a default.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);
        tracing::debug!(path = %path, "loading config");

        Self::extract(
            Figment::new()
                .merge(Toml::file(&path))
                .merge(Env::prefixed("RELAY_").split("__")),
        )
    }

    /// Parse config from an in-memory TOML document (no env layering).
    pub fn from_toml_str(toml: &str) -> crate::error::Result<Self> {
        Self::extract(Figment::new().merge(Toml::string(toml)))
    }

    fn extract(figment: Figment) -> crate::error::Result<Self> {
        let config: RelayConfig = figment
            .extract()
            .map_err(|e| crate::error::RelayError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the relay cannot run with.
    pub fn validate(&self) -> crate::error::Result<()> {
        let limits = &self.relay;
        if limits.send_timeout_ms == 0 {
            return Err(crate::error::RelayError::Config(
                "relay.send_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if limits.max_message_bytes == 0 {
            return Err(crate::error::RelayError::Config(
                "relay.max_message_bytes must be greater than zero".to_string(),
            ));
        }
        if limits.history_replay > limits.history_capacity {
            return Err(crate::error::RelayError::Config(format!(
                "relay.history_replay ({}) exceeds relay.history_capacity ({})",
                limits.history_replay, limits.history_capacity
            )));
        }
        Ok(())
    }

    /// `bind:port` string for the listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.gateway.bind, self.gateway.port)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.relay/relay.toml", home)
}

use clap::Parser;
use std::sync::Arc;
use tracing::info;

mod app;
mod http;
mod ws;

/// WebSocket chat relay: every line a client sends is rebroadcast to all
/// connected clients.
#[derive(Debug, Parser)]
#[command(name = "relay-gateway", version)]
struct Cli {
    /// Path to relay.toml (falls back to RELAY_CONFIG, then ~/.relay/relay.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Listen address, overrides gateway.bind
    #[arg(long)]
    bind: Option<String>,

    /// Listen port, overrides gateway.port
    #[arg(short, long)]
    port: Option<u16>,
}

impl Cli {
    fn load_config(&self) -> relay_core::RelayConfig {
        // explicit flag > RELAY_CONFIG env > ~/.relay/relay.toml
        let path = self
            .config
            .clone()
            .or_else(|| std::env::var("RELAY_CONFIG").ok());
        let mut config = relay_core::RelayConfig::load(path.as_deref()).unwrap_or_else(|e| {
            tracing::warn!("Config load failed ({}), using defaults", e);
            relay_core::RelayConfig::default()
        });
        self.apply_overrides(&mut config);
        config
    }

    fn apply_overrides(&self, config: &mut relay_core::RelayConfig) {
        if let Some(ref bind) = self.bind {
            config.gateway.bind = bind.clone();
        }
        if let Some(port) = self.port {
            config.gateway.port = port;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "relay_gateway=info,relay_hub=info,tower_http=debug".into()
            }),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.load_config();
    let addr = config.listen_addr();
    info!(
        send_timeout_ms = config.relay.send_timeout_ms,
        history_capacity = config.relay.history_capacity,
        "relay configured"
    );

    let state = Arc::new(app::AppState::new(config));
    let router = app::build_router(state.clone());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Relay gateway listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    info!("Relay gateway stopped");
    Ok(())
}

/// Resolves on Ctrl-C after releasing every connection task.
async fn shutdown_signal(state: Arc<app::AppState>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl-C");
        return;
    }
    info!("shutdown signal received");
    state.begin_shutdown();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_file_values() {
        let cli = Cli::try_parse_from(["relay-gateway", "--bind", "0.0.0.0", "-p", "6000"]).unwrap();
        let mut config = relay_core::RelayConfig::default();

        cli.apply_overrides(&mut config);

        assert_eq!(config.listen_addr(), "0.0.0.0:6000");
    }

    #[test]
    fn no_flags_keep_config() {
        let cli = Cli::try_parse_from(["relay-gateway"]).unwrap();
        let mut config = relay_core::RelayConfig::default();

        cli.apply_overrides(&mut config);

        assert_eq!(config.gateway.port, relay_core::config::DEFAULT_PORT);
        assert!(cli.config.is_none());
    }

    #[test]
    fn relay_config_env_selects_the_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("from-env.toml", "[gateway]\nport = 6200")?;
            jail.set_env("RELAY_CONFIG", "from-env.toml");

            let cli = Cli::try_parse_from(["relay-gateway"]).unwrap();
            assert_eq!(cli.load_config().gateway.port, 6200);
            Ok(())
        });
    }

    #[test]
    fn config_flag_beats_relay_config_env() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("from-env.toml", "[gateway]\nport = 6200")?;
            jail.create_file("from-flag.toml", "[gateway]\nport = 6300")?;
            jail.set_env("RELAY_CONFIG", "from-env.toml");

            let cli = Cli::try_parse_from(["relay-gateway", "-c", "from-flag.toml", "--bind", "0.0.0.0"])
                .unwrap();
            assert_eq!(cli.load_config().listen_addr(), "0.0.0.0:6300");
            Ok(())
        });
    }

    #[test]
    fn rejects_non_numeric_port() {
        assert!(Cli::try_parse_from(["relay-gateway", "--port", "abc"]).is_err());
    }
}

use axum::{routing::get, Router};
use relay_core::config::RelayConfig;
use relay_hub::RelayHub;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Central shared state — passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: RelayConfig,
    /// Connection registry, broadcast engine and history.
    pub hub: RelayHub,
    /// Cancelled once on shutdown; every connection task watches it.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: RelayConfig) -> Self {
        let hub = RelayHub::new(&config.relay);
        Self {
            config,
            hub,
            shutdown: CancellationToken::new(),
        }
    }

    /// Drop all registrations, then release every connection task. Clearing
    /// first means the closing tasks see their disconnects as no-ops and do
    /// not announce departures to each other.
    pub fn begin_shutdown(&self) {
        self.hub.shutdown();
        self.shutdown.cancel();
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/ws", get(crate::ws::connection::ws_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

//! switchyardd — Switchyard facilitator gateway daemon.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use switchyard_api::ApiState;
use switchyard_core::GatewayConfig;
use switchyard_services::{ForwardTimeouts, Forwarder, PeerRegistry, StickyRouter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load config
    if let Err(e) = GatewayConfig::write_default_if_missing() {
        eprintln!("switchyardd: failed to write default config: {}", e);
    }
    let (config, load_error) = match GatewayConfig::load() {
        Ok(config) => (config, None),
        Err(e) => (GatewayConfig::default(), Some(e)),
    };

    let default_level = if config.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    if let Some(e) = load_error {
        tracing::warn!(error = %e, "failed to load config, using defaults");
    }
    tracing::info!(
        path = %GatewayConfig::file_path().display(),
        static_peers = config.peers.static_peers.len(),
        "switchyardd starting"
    );

    let routing = &config.routing;

    // Shared state
    let registry = PeerRegistry::new(routing.registry_ttl());
    let sticky = StickyRouter::new(routing.selection_ttl());
    registry.start_sweeper(routing.cleanup_interval());
    sticky.start_sweeper(routing.cleanup_interval());

    for peer in &config.peers.static_peers {
        tracing::info!(peer = %peer, "static peer");
    }

    let forwarder = Forwarder::new(
        registry.clone(),
        sticky.clone(),
        config.peers.static_peers.clone(),
        ForwardTimeouts::from(routing),
    );
    let state = ApiState::new(forwarder);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        tracing::info!("shutting down");
    };

    let served = switchyard_api::serve(state, &config.network, shutdown)
        .await
        .with_context(|| {
            format!(
                "gateway server failed on {}:{}",
                config.network.listen_addr, config.network.port
            )
        });

    // ── Teardown ─────────────────────────────────────────────────────────────

    registry.destroy();
    sticky.destroy();
    served
}

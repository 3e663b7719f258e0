//! Run the heartbeat emitter for a facilitator node until Ctrl-C.

use anyhow::{Context, Result};

use switchyard_core::config::HeartbeatConfig;
use switchyard_services::HeartbeatEmitter;

pub async fn cmd_announce(config: HeartbeatConfig) -> Result<()> {
    println!(
        "Announcing {} to {} gateway(s) every {}s. Ctrl-C to stop.",
        config.self_url,
        config.gateways.len(),
        config.interval().as_secs()
    );

    let emitter = HeartbeatEmitter::start(reqwest::Client::new(), &config, None);
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    emitter.stop();

    println!("Stopped.");
    Ok(())
}

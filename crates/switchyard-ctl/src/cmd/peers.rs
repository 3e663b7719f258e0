//! Peer membership commands: peers, register, health.

use anyhow::{bail, Result};
use serde::Deserialize;
use serde_json::Value;

use switchyard_core::wire::RegisterRequest;

use super::http::{endpoint, get_json, post_json_body};

#[derive(Deserialize)]
struct PeersResponse {
    peers: Vec<String>,
}

#[derive(Deserialize)]
struct HealthResponse {
    peers: usize,
    registered: usize,
    sticky: StickyCounts,
    #[serde(default)]
    registry: Vec<RegisteredPeer>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisteredPeer {
    url: String,
    kinds: Option<Vec<Value>>,
    age_ms: u64,
}

#[derive(Deserialize)]
struct StickyCounts {
    payers: usize,
    fingerprints: usize,
}

pub async fn cmd_peers(gateway: &str) -> Result<()> {
    let resp: PeersResponse = get_json(&endpoint(gateway, "/peers")).await?;

    if resp.peers.is_empty() {
        println!("No active peers.");
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Active Peers ({})", resp.peers.len());
    println!("═══════════════════════════════════════");
    for peer in &resp.peers {
        println!("  • {}", peer);
    }

    Ok(())
}

pub async fn cmd_register(gateway: &str, url: &str) -> Result<()> {
    let body = RegisterRequest {
        url: url.to_string(),
        kinds: None,
    };
    let (status, reply): (u16, Value) = post_json_body(&endpoint(gateway, "/register"), &body).await?;

    if status != 200 {
        let error = reply["error"].as_str().unwrap_or("unknown error");
        bail!("registration rejected ({}): {}", status, error);
    }
    println!("Registered {}.", url);
    Ok(())
}

pub async fn cmd_health(gateway: &str) -> Result<()> {
    let resp: HealthResponse = get_json(&endpoint(gateway, "/health")).await?;

    println!("═══════════════════════════════════════");
    println!("  Switchyard Gateway Health");
    println!("═══════════════════════════════════════");
    println!("  Active peers        : {}", resp.peers);
    println!("  Registered peers    : {}", resp.registered);
    println!("  Sticky payers       : {}", resp.sticky.payers);
    println!("  Sticky fingerprints : {}", resp.sticky.fingerprints);

    for peer in &resp.registry {
        let kinds = peer.kinds.as_ref().map_or(0, Vec::len);
        println!(
            "  • {} (last heartbeat {}s ago, {} kinds)",
            peer.url,
            peer.age_ms / 1000,
            kinds
        );
    }

    Ok(())
}

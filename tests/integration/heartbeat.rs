use crate::*;

use switchyard_core::config::HeartbeatConfig;
use switchyard_services::HeartbeatEmitter;

/// A node announcing itself becomes routable without static config.
#[tokio::test]
async fn test_heartbeat_registers_node() -> Result<()> {
    let a = spawn_node(NodeSpec::healthy("a")).await?;
    let gw = spawn_gateway(Vec::new(), "/facilitator").await?;

    let config = HeartbeatConfig {
        self_url: a.url.clone(),
        gateways: vec![gw.url.clone()],
        interval_ms: 30_000,
        kinds: vec![json!({"scheme": "exact", "network": "base"})],
    };
    let emitter = HeartbeatEmitter::start(reqwest::Client::new(), &config, None);

    let mut registered = false;
    for _ in 0..50 {
        let (_, peers) = api_get(&format!("{}/peers", gw.url)).await?;
        if peers == json!({"peers": [a.url.clone()]}) {
            registered = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(registered, "heartbeat never registered the node");

    let entries = gw.state.registry.entries();
    assert_eq!(entries[0].kinds, Some(config.kinds.clone()));

    let (status, body) = api_post(&format!("{}/verify", gw.url), &evm_payment("0x1")).await?;
    assert_eq!(status, 200);
    assert_eq!(body["node"], "a");

    emitter.stop();
    Ok(())
}

use crate::*;

#[tokio::test]
async fn test_register_and_route_to_dynamic_peer() -> Result<()> {
    let a = spawn_node(NodeSpec::healthy("a")).await?;
    let gw = spawn_gateway(Vec::new(), "").await?;

    let (status, body) = api_post(
        &format!("{}/register", gw.url),
        &json!({"url": format!("{}/", a.url), "kinds": [{"scheme": "exact"}]}),
    )
    .await?;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"ok": true}));

    let (_, peers) = api_get(&format!("{}/peers", gw.url)).await?;
    assert_eq!(peers, json!({"peers": [a.url.clone()]}));

    let (status, verified) = api_post(&format!("{}/verify", gw.url), &evm_payment("0x1")).await?;
    assert_eq!(status, 200);
    assert_eq!(verified["node"], "a");
    Ok(())
}

#[tokio::test]
async fn test_invalid_registration_rejected() -> Result<()> {
    let gw = spawn_gateway(vec!["http://static-node:4021".to_string()], "").await?;

    for body in [json!({"url": "static-node:4022"}), json!({"kinds": []}), json!({"url": null})] {
        let (status, reply) = api_post(&format!("{}/register", gw.url), &body).await?;
        assert_eq!(status, 400);
        assert_eq!(reply, json!({"error": "Invalid url"}));
    }

    let (_, peers) = api_get(&format!("{}/peers", gw.url)).await?;
    assert_eq!(peers, json!({"peers": ["http://static-node:4021"]}));
    Ok(())
}

/// Static and registered copies of one URL show up once.
#[tokio::test]
async fn test_peer_set_is_deduplicated() -> Result<()> {
    let gw = spawn_gateway(vec!["http://node:4021/".to_string()], "").await?;
    api_post(&format!("{}/register", gw.url), &json!({"url": "http://node:4021"})).await?;
    api_post(&format!("{}/register", gw.url), &json!({"url": "http://other:4021"})).await?;

    let (_, peers) = api_get(&format!("{}/peers", gw.url)).await?;
    assert_eq!(peers, json!({"peers": ["http://node:4021", "http://other:4021"]}));
    Ok(())
}

/// Registered peers vanish once they stop heartbeating.
#[tokio::test]
async fn test_registered_peer_expires() -> Result<()> {
    let gw = spawn_gateway_with(Vec::new(), "", Duration::from_millis(300)).await?;
    api_post(&format!("{}/register", gw.url), &json!({"url": "http://node:4021"})).await?;

    let (_, peers) = api_get(&format!("{}/peers", gw.url)).await?;
    assert_eq!(peers["peers"].as_array().map(Vec::len), Some(1));

    tokio::time::sleep(Duration::from_millis(600)).await;
    let (_, peers) = api_get(&format!("{}/peers", gw.url)).await?;
    assert_eq!(peers, json!({"peers": []}));
    assert_eq!(gw.state.registry.len(), 0, "sweeper should have removed the entry");
    Ok(())
}

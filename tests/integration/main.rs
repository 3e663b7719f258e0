//! Switchyard integration test harness.
//!
//! Every test runs a real gateway on 127.0.0.1 against in-process
//! facilitator nodes, all on ephemeral ports. Nothing is shared between
//! tests: each builds its own registry, sticky router and forwarder.
//!
//!   cargo test --test integration

mod heartbeat;
mod registration;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use switchyard_api::ApiState;
use switchyard_services::{ForwardTimeouts, Forwarder, PeerRegistry, StickyRouter};

// ── Facilitator nodes ─────────────────────────────────────────────────────────

/// How a test node answers.
#[derive(Clone)]
pub struct NodeSpec {
    pub name: &'static str,
    pub verify_status: u16,
    pub settle_status: u16,
    pub kinds: Vec<Value>,
}

impl NodeSpec {
    pub fn healthy(name: &'static str) -> Self {
        Self {
            name,
            verify_status: 200,
            settle_status: 200,
            kinds: vec![json!({"x402Version": 1, "scheme": "exact", "network": "base"})],
        }
    }
}

#[derive(Clone)]
struct NodeState {
    spec: NodeSpec,
    verify_calls: Arc<AtomicUsize>,
    settle_calls: Arc<AtomicUsize>,
}

/// A running facilitator node.
pub struct Node {
    pub url: String,
    state: NodeState,
}

impl Node {
    pub fn verify_calls(&self) -> usize {
        self.state.verify_calls.load(Ordering::SeqCst)
    }

    pub fn settle_calls(&self) -> usize {
        self.state.settle_calls.load(Ordering::SeqCst)
    }
}

async fn node_verify(State(node): State<NodeState>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    node.verify_calls.fetch_add(1, Ordering::SeqCst);
    let payer = body
        .pointer("/paymentPayload/payload/authorization/from")
        .cloned()
        .unwrap_or(Value::Null);
    let status = StatusCode::from_u16(node.spec.verify_status).unwrap_or(StatusCode::OK);
    let reply = if status.is_success() {
        json!({"isValid": true, "payer": payer, "node": node.spec.name})
    } else {
        json!({"isValid": false, "invalidReason": "invalid_payload", "node": node.spec.name})
    };
    (status, Json(reply))
}

async fn node_settle(State(node): State<NodeState>, Json(_body): Json<Value>) -> (StatusCode, Json<Value>) {
    node.settle_calls.fetch_add(1, Ordering::SeqCst);
    let status = StatusCode::from_u16(node.spec.settle_status).unwrap_or(StatusCode::OK);
    let reply = json!({
        "success": status.is_success(),
        "txHash": format!("0x{}", node.spec.name),
        "networkId": "base",
        "node": node.spec.name,
    });
    (status, Json(reply))
}

async fn node_supported(State(node): State<NodeState>) -> Json<Value> {
    Json(json!({"kinds": node.spec.kinds}))
}

pub async fn spawn_node(spec: NodeSpec) -> Result<Node> {
    let state = NodeState {
        spec,
        verify_calls: Arc::new(AtomicUsize::new(0)),
        settle_calls: Arc::new(AtomicUsize::new(0)),
    };
    let app = Router::new()
        .route("/verify", post(node_verify))
        .route("/settle", post(node_settle))
        .route("/supported", get(node_supported))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let url = format!("http://{}", listener.local_addr()?);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(Node { url, state })
}

/// A URL with nothing listening behind it.
pub async fn dead_url() -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let url = format!("http://{}", listener.local_addr()?);
    drop(listener);
    Ok(url)
}

// ── Gateway ───────────────────────────────────────────────────────────────────

pub struct Gateway {
    /// Base URL including the base path.
    pub url: String,
    pub state: ApiState,
    shutdown: Option<oneshot::Sender<()>>,
}

impl Drop for Gateway {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.state.registry.destroy();
        self.state.sticky.destroy();
    }
}

pub async fn spawn_gateway(static_peers: Vec<String>, base_path: &str) -> Result<Gateway> {
    spawn_gateway_with(static_peers, base_path, Duration::from_secs(120)).await
}

pub async fn spawn_gateway_with(
    static_peers: Vec<String>,
    base_path: &str,
    registry_ttl: Duration,
) -> Result<Gateway> {
    let registry = PeerRegistry::new(registry_ttl);
    let sticky = StickyRouter::new(Duration::from_secs(60));
    registry.start_sweeper(Duration::from_millis(100));
    sticky.start_sweeper(Duration::from_millis(100));

    let timeouts = ForwardTimeouts {
        verify: Duration::from_secs(2),
        settle: Duration::from_secs(2),
        supported: Duration::from_secs(2),
    };
    let state = ApiState::new(Forwarder::new(registry, sticky, static_peers, timeouts));

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let url = format!("http://{}{}", listener.local_addr()?, base_path.trim_end_matches('/'));
    let (tx, rx) = oneshot::channel::<()>();
    let served = state.clone();
    let base_path = base_path.to_string();
    tokio::spawn(async move {
        let shutdown = async {
            let _ = rx.await;
        };
        if let Err(e) = switchyard_api::serve_with_listener(listener, served, &base_path, shutdown).await {
            eprintln!("gateway exited: {e}");
        }
    });

    Ok(Gateway {
        url,
        state,
        shutdown: Some(tx),
    })
}

// ── HTTP helpers ──────────────────────────────────────────────────────────────

pub async fn api_get(url: &str) -> Result<(u16, Value)> {
    let resp = reqwest::get(url)
        .await
        .with_context(|| format!("GET {url}"))?;
    let status = resp.status().as_u16();
    Ok((status, resp.json().await.context("response was not JSON")?))
}

pub async fn api_post(url: &str, body: &Value) -> Result<(u16, Value)> {
    let resp = reqwest::Client::new()
        .post(url)
        .json(body)
        .send()
        .await
        .with_context(|| format!("POST {url}"))?;
    let status = resp.status().as_u16();
    Ok((status, resp.json().await.context("response was not JSON")?))
}

/// An EVM-style payment body for `payer`.
pub fn evm_payment(payer: &str) -> Value {
    json!({
        "x402Version": 1,
        "paymentPayload": {
            "x402Version": 1,
            "scheme": "exact",
            "network": "base",
            "payload": {
                "signature": "0xsig",
                "authorization": {"from": payer, "to": "0xmerchant", "value": "1000"}
            }
        },
        "paymentRequirements": {"scheme": "exact", "network": "base", "maxAmountRequired": "1000"}
    })
}

/// A Solana-style body with no payer field, only a raw transaction.
pub fn svm_payment(tx: &str) -> Value {
    json!({
        "paymentPayload": {"scheme": "exact", "network": "solana", "payload": {"transaction": tx}},
        "paymentRequirements": {"scheme": "exact", "network": "solana"}
    })
}

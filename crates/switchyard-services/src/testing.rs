//! In-process facilitator peers for forwarding tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

#[derive(Clone)]
pub(crate) struct MockPeer {
    name: &'static str,
    verify_status: u16,
    settle_status: u16,
    kinds: Vec<Value>,
    delay: Duration,
    verify_calls: Arc<AtomicUsize>,
    settle_calls: Arc<AtomicUsize>,
}

impl MockPeer {
    pub(crate) fn healthy(name: &'static str) -> Self {
        Self {
            name,
            verify_status: 200,
            settle_status: 200,
            kinds: Vec::new(),
            delay: Duration::ZERO,
            verify_calls: Arc::new(AtomicUsize::new(0)),
            settle_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn verify_status(mut self, status: u16) -> Self {
        self.verify_status = status;
        self
    }

    pub(crate) fn settle_status(mut self, status: u16) -> Self {
        self.settle_status = status;
        self
    }

    pub(crate) fn kinds(mut self, kinds: Vec<Value>) -> Self {
        self.kinds = kinds;
        self
    }

    pub(crate) fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

pub(crate) struct RunningPeer {
    pub(crate) url: String,
    mock: MockPeer,
}

impl RunningPeer {
    pub(crate) fn calls(&self) -> usize {
        self.mock.verify_calls.load(Ordering::SeqCst) + self.settle_calls()
    }

    pub(crate) fn settle_calls(&self) -> usize {
        self.mock.settle_calls.load(Ordering::SeqCst)
    }
}

async fn handle_verify(State(mock): State<MockPeer>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    mock.verify_calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(mock.delay).await;
    let ok = mock.verify_status < 300;
    (
        StatusCode::from_u16(mock.verify_status).unwrap(),
        Json(json!({"isValid": ok, "node": mock.name, "received": body})),
    )
}

async fn handle_settle(State(mock): State<MockPeer>, Json(_body): Json<Value>) -> (StatusCode, Json<Value>) {
    mock.settle_calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(mock.delay).await;
    let ok = mock.settle_status < 300;
    (
        StatusCode::from_u16(mock.settle_status).unwrap(),
        Json(json!({"success": ok, "node": mock.name, "txHash": "0xfeed", "networkId": "base"})),
    )
}

async fn handle_supported(State(mock): State<MockPeer>) -> Json<Value> {
    tokio::time::sleep(mock.delay).await;
    Json(json!({"kinds": mock.kinds}))
}

pub(crate) async fn spawn_peer(mock: MockPeer) -> RunningPeer {
    let app = Router::new()
        .route("/verify", post(handle_verify))
        .route("/settle", post(handle_settle))
        .route("/supported", get(handle_supported))
        .with_state(mock.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    RunningPeer { url, mock }
}

/// A URL nothing is listening on.
pub(crate) async fn dead_peer() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    url
}

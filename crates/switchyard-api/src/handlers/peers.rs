//! /register, /peers, /health — peer membership and diagnostics.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use switchyard_core::wire::is_valid_peer_url;
use switchyard_services::StickyCounts;

use super::ApiState;

// ── /register (POST) ──────────────────────────────────────────────────────────

pub async fn handle_register(
    State(state): State<ApiState>,
    body: Result<Json<Value>, JsonRejection>,
) -> (StatusCode, Json<Value>) {
    let body = body.map(|Json(v)| v).unwrap_or(Value::Null);

    let Some(url) = body
        .get("url")
        .and_then(Value::as_str)
        .filter(|url| is_valid_peer_url(url))
    else {
        tracing::debug!("rejected registration with invalid url");
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid url" })),
        );
    };

    let kinds = body.get("kinds").and_then(Value::as_array).cloned();
    state.registry.register(url, kinds);

    (StatusCode::OK, Json(json!({ "ok": true })))
}

// ── /peers (GET) ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct PeersResponse {
    pub peers: Vec<String>,
}

pub async fn handle_peers(State(state): State<ApiState>) -> Json<PeersResponse> {
    Json(PeersResponse {
        peers: state.forwarder.active_peers(),
    })
}

// ── /health (GET) ─────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    /// Size of the active peer set, static peers included.
    pub peers: usize,
    /// Self-registered peers currently held, expired-but-unswept included.
    pub registered: usize,
    pub sticky: StickyCounts,
    pub registry: Vec<RegisteredPeer>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredPeer {
    pub url: String,
    pub kinds: Option<Vec<Value>>,
    /// Milliseconds since the last heartbeat.
    pub age_ms: u64,
}

pub async fn handle_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let registry: Vec<RegisteredPeer> = state
        .registry
        .entries()
        .into_iter()
        .map(|entry| RegisteredPeer {
            age_ms: entry.age().as_millis() as u64,
            url: entry.url,
            kinds: entry.kinds,
        })
        .collect();

    Json(HealthResponse {
        ok: true,
        peers: state.forwarder.active_peers().len(),
        registered: registry.len(),
        sticky: state.sticky.len(),
        registry,
    })
}

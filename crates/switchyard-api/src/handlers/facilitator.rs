//! /verify, /settle, /supported — the facilitator surface proxied to peers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use switchyard_services::ForwardError;

use super::{upstream_status, ApiState};

type JsonReply = (StatusCode, Json<Value>);

// ── /supported (GET) ──────────────────────────────────────────────────────────

pub async fn handle_supported(State(state): State<ApiState>) -> Json<Value> {
    let kinds = state.forwarder.supported().await;
    Json(json!({ "kinds": kinds }))
}

// ── /verify (POST) ────────────────────────────────────────────────────────────

pub async fn handle_verify(
    State(state): State<ApiState>,
    body: Result<Json<Value>, JsonRejection>,
) -> JsonReply {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return invalid_request(rejection.body_text()),
    };

    match state.forwarder.verify(body).await {
        Ok(resp) => (upstream_status(resp.status), Json(resp.body)),
        Err(ForwardError::Upstream(resp)) => (upstream_status(resp.status), Json(resp.body)),
        Err(ForwardError::InvalidRequest(e)) => invalid_request(e.to_string()),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": e.to_string() })),
        ),
    }
}

fn invalid_request(message: String) -> JsonReply {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "Invalid request", "message": message })),
    )
}

// ── /settle (POST) ────────────────────────────────────────────────────────────

pub async fn handle_settle(
    State(state): State<ApiState>,
    body: Result<Json<Value>, JsonRejection>,
) -> JsonReply {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return invalid_settlement(rejection.body_text()),
    };

    match state.forwarder.settle(body).await {
        Ok(resp) => (upstream_status(resp.status), Json(resp.body)),
        Err(ForwardError::InvalidRequest(e)) => invalid_settlement(e.to_string()),
        Err(ForwardError::NoPeers) => settlement_failure(&ForwardError::NoPeers),
        // Partial failure detail from one peer is never surfaced as final.
        Err(_) => settlement_failure(&ForwardError::SettlementUnavailable),
    }
}

/// Settlement errors keep the fields settle callers read, nulled out.
fn settlement_failure(e: &ForwardError) -> JsonReply {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({
            "success": false,
            "error": e.to_string(),
            "txHash": null,
            "networkId": null,
        })),
    )
}

fn invalid_settlement(message: String) -> JsonReply {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "success": false,
            "error": "Invalid request",
            "message": message,
            "txHash": null,
            "networkId": null,
        })),
    )
}

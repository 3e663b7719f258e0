//! Switchyard wire shapes — the JSON bodies exchanged between clients,
//! the gateway, and facilitator peers.
//!
//! Payment payloads and requirements are opaque to the gateway. The only
//! fields it reads are the ones it needs for sticky routing, and those
//! lookups never fail loudly: a missing field is simply `None`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Strip trailing slashes so `http://a/` and `http://a` name the same peer.
pub fn normalize_peer_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// Registration URLs only need an `http://` or `https://` prefix.
pub fn is_valid_peer_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

// ── Forward request ───────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RequestShapeError {
    #[error("request body must be a JSON object")]
    NotAnObject,
    #[error("request body has neither paymentPayload nor paymentHeader")]
    MissingPayload,
}

/// The canonical body sent to a peer's `/verify` and `/settle`.
///
/// Clients may send either `{paymentPayload, paymentRequirements}` or the
/// legacy `{paymentHeader, paymentRequirements}`. Both are folded into this
/// shape once, before any routing happens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x402_version: Option<Value>,
    pub payment_payload: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payment_requirements: Value,
}

/// Key under which a legacy header string is wrapped inside the payload.
pub const LEGACY_HEADER_KEY: &str = "paymentHeader";

impl ForwardRequest {
    /// Normalize an inbound body into the canonical shape.
    pub fn from_value(body: Value) -> Result<Self, RequestShapeError> {
        let Value::Object(mut obj) = body else {
            return Err(RequestShapeError::NotAnObject);
        };

        let x402_version = obj.remove("x402Version").filter(|v| !v.is_null());
        let payment_requirements = obj.remove("paymentRequirements").unwrap_or(Value::Null);

        let payment_payload = match obj.remove("paymentPayload") {
            Some(payload) if !payload.is_null() => payload,
            _ => match obj.remove(LEGACY_HEADER_KEY) {
                Some(Value::String(header)) => {
                    let mut wrapped = Map::new();
                    wrapped.insert(LEGACY_HEADER_KEY.to_string(), Value::String(header));
                    Value::Object(wrapped)
                }
                _ => return Err(RequestShapeError::MissingPayload),
            },
        };

        Ok(Self {
            x402_version,
            payment_payload,
            payment_requirements,
        })
    }

    /// Sender address embedded in an EVM-style authorization
    /// (`paymentPayload.payload.authorization.from`).
    pub fn payer(&self) -> Option<&str> {
        self.payment_payload
            .pointer("/payload/authorization/from")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Opaque credential that identifies this transaction when no payer
    /// is available: the legacy header string, else a raw transaction blob.
    pub fn credential(&self) -> Option<&str> {
        let header = self
            .payment_payload
            .get(LEGACY_HEADER_KEY)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty());
        if header.is_some() {
            return header;
        }
        self.payment_payload
            .pointer("/payload/transaction")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// Hex BLAKE3 digest of a credential, used as the fingerprint map key.
pub fn fingerprint(credential: &str) -> String {
    hex::encode(blake3::hash(credential.as_bytes()).as_bytes())
}

/// Payer reported by a peer in its verify response (`{"payer": "0x…"}`).
pub fn payer_from_response(body: &Value) -> Option<&str> {
    body.get("payer")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

// ── Discovery and registration ────────────────────────────────────────────────

/// Body of `GET /supported`, on peers and on the gateway alike.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupportedResponse {
    #[serde(default)]
    pub kinds: Vec<Value>,
}

/// Body of `POST /register`, sent by the heartbeat emitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kinds: Option<Vec<Value>>,
}

//! Forwarding engine — routes verify and settle to facilitator peers.
//!
//! Peers are tried one at a time, never in parallel, so a settlement is
//! only ever attempted by one peer per inbound request. The first 2xx
//! answer is returned untouched; the gateway never fabricates success.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::Value;

use switchyard_core::config::RoutingConfig;
use switchyard_core::{ForwardRequest, RequestShapeError};

use crate::peer::PeerRegistry;
use crate::sticky::StickyRouter;
use crate::supported::aggregate_supported;

// ── Selection ─────────────────────────────────────────────────────────────────

/// Starting peer for a transaction with no sticky preference.
pub fn select_peer<'a, R: Rng + ?Sized>(peers: &'a [String], rng: &mut R) -> Option<&'a String> {
    match peers {
        [] => None,
        [only] => Some(only),
        _ => peers.choose(rng),
    }
}

/// `preferred` first, then every other peer in a fresh random order.
pub fn build_fallback_order<R: Rng + ?Sized>(
    peers: &[String],
    preferred: &str,
    rng: &mut R,
) -> Vec<String> {
    let mut rest: Vec<String> = peers
        .iter()
        .filter(|p| p.as_str() != preferred)
        .cloned()
        .collect();
    rest.shuffle(rng);

    let mut order = Vec::with_capacity(rest.len() + 1);
    order.push(preferred.to_string());
    order.extend(rest);
    order
}

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Verify,
    Settle,
}

impl Operation {
    pub fn path(self) -> &'static str {
        match self {
            Operation::Verify => "/verify",
            Operation::Settle => "/settle",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Verify => f.write_str("verify"),
            Operation::Settle => f.write_str("settle"),
        }
    }
}

/// A well-formed JSON answer from a peer, success or not.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerResponse {
    pub peer: String,
    pub status: u16,
    pub body: Value,
}

impl PeerResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("No peers configured")]
    NoPeers,
    #[error("Verification unavailable")]
    VerificationUnavailable,
    #[error("Settlement unavailable")]
    SettlementUnavailable,
    /// Every peer failed and this was the last well-formed error answer.
    #[error("peer {} returned status {}", .0.peer, .0.status)]
    Upstream(PeerResponse),
    #[error(transparent)]
    InvalidRequest(#[from] RequestShapeError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwardTimeouts {
    pub verify: Duration,
    pub settle: Duration,
    pub supported: Duration,
}

impl Default for ForwardTimeouts {
    fn default() -> Self {
        Self::from(&RoutingConfig::default())
    }
}

impl From<&RoutingConfig> for ForwardTimeouts {
    fn from(routing: &RoutingConfig) -> Self {
        Self {
            verify: routing.verify_timeout(),
            settle: routing.settle_timeout(),
            supported: routing.supported_timeout(),
        }
    }
}

// ── Forwarder ─────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct Forwarder {
    registry: PeerRegistry,
    sticky: StickyRouter,
    static_peers: Arc<Vec<String>>,
    client: reqwest::Client,
    timeouts: ForwardTimeouts,
    rng: Arc<Mutex<StdRng>>,
}

impl Forwarder {
    pub fn new(
        registry: PeerRegistry,
        sticky: StickyRouter,
        static_peers: Vec<String>,
        timeouts: ForwardTimeouts,
    ) -> Self {
        Self {
            registry,
            sticky,
            static_peers: Arc::new(static_peers),
            client: reqwest::Client::new(),
            timeouts,
            rng: Arc::new(Mutex::new(StdRng::from_entropy())),
        }
    }

    /// Replace the entropy-seeded RNG with a deterministic one.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Arc::new(Mutex::new(StdRng::seed_from_u64(seed)));
        self
    }

    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    pub fn sticky(&self) -> &StickyRouter {
        &self.sticky
    }

    /// Static and live registered peers, recomputed on every call.
    pub fn active_peers(&self) -> Vec<String> {
        self.registry.active_peers(&self.static_peers)
    }

    /// First leg of a transaction: any peer may verify it.
    pub async fn verify(&self, body: Value) -> Result<PeerResponse, ForwardError> {
        let peers = self.active_peers();
        if peers.is_empty() {
            return Err(ForwardError::NoPeers);
        }
        let request = ForwardRequest::from_value(body)?;

        let order = self.fallback_order(&peers, None);
        match self.forward(Operation::Verify, &order, &request).await {
            Ok(resp) => {
                self.sticky.record_selection(&resp.peer, &request, &resp.body);
                Ok(resp)
            }
            Err(Some(last)) => Err(ForwardError::Upstream(last)),
            Err(None) => Err(ForwardError::VerificationUnavailable),
        }
    }

    /// Second leg: prefer the peer that verified this transaction.
    pub async fn settle(&self, body: Value) -> Result<PeerResponse, ForwardError> {
        let peers = self.active_peers();
        if peers.is_empty() {
            return Err(ForwardError::NoPeers);
        }
        let request = ForwardRequest::from_value(body)?;

        let preferred = self
            .sticky
            .preferred_peer(&request)
            .filter(|peer| peers.contains(peer));
        if let Some(peer) = &preferred {
            tracing::debug!(peer = %peer, "settle routed by sticky selection");
        }

        let order = self.fallback_order(&peers, preferred);
        self.forward(Operation::Settle, &order, &request)
            .await
            .map_err(|_| ForwardError::SettlementUnavailable)
    }

    /// Deduplicated union of every active peer's capability kinds.
    pub async fn supported(&self) -> Vec<Value> {
        let peers = self.active_peers();
        aggregate_supported(&self.client, &peers, self.timeouts.supported).await
    }

    fn fallback_order(&self, peers: &[String], preferred: Option<String>) -> Vec<String> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let first = match preferred {
            Some(peer) => peer,
            None => match select_peer(peers, &mut *rng) {
                Some(peer) => peer.clone(),
                None => return Vec::new(),
            },
        };
        build_fallback_order(peers, &first, &mut *rng)
    }

    /// Try `order` sequentially. `Err` carries the last well-formed error
    /// answer, if any peer gave one.
    async fn forward(
        &self,
        op: Operation,
        order: &[String],
        request: &ForwardRequest,
    ) -> Result<PeerResponse, Option<PeerResponse>> {
        let mut last_error = None;
        for peer in order {
            match self.call_peer(op, peer, request).await {
                Ok(resp) if resp.is_success() => {
                    tracing::debug!(%op, peer = %peer, status = resp.status, "peer answered");
                    return Ok(resp);
                }
                Ok(resp) => {
                    tracing::debug!(%op, peer = %peer, status = resp.status, "peer returned error status");
                    last_error = Some(resp);
                }
                Err(e) => {
                    tracing::debug!(%op, peer = %peer, error = %e, "peer call failed");
                }
            }
        }
        tracing::warn!(%op, tried = order.len(), "no peer succeeded");
        Err(last_error)
    }

    async fn call_peer(
        &self,
        op: Operation,
        peer: &str,
        request: &ForwardRequest,
    ) -> Result<PeerResponse, reqwest::Error> {
        let timeout = match op {
            Operation::Verify => self.timeouts.verify,
            Operation::Settle => self.timeouts.settle,
        };
        let resp = self
            .client
            .post(format!("{}{}", peer, op.path()))
            .timeout(timeout)
            .json(request)
            .send()
            .await?;
        let status = resp.status().as_u16();
        let body = resp.json::<Value>().await?;
        Ok(PeerResponse {
            peer: peer.to_string(),
            status,
            body,
        })
    }
}

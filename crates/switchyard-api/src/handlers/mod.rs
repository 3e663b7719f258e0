//! HTTP API handlers — the gateway's public surface.

pub mod facilitator;
pub mod peers;

use axum::http::StatusCode;

use switchyard_services::{Forwarder, PeerRegistry, StickyRouter};

#[derive(Clone)]
pub struct ApiState {
    pub registry: PeerRegistry,
    pub sticky: StickyRouter,
    pub forwarder: Forwarder,
}

impl ApiState {
    /// Share the forwarder's registry and sticky router with the handlers.
    pub fn new(forwarder: Forwarder) -> Self {
        Self {
            registry: forwarder.registry().clone(),
            sticky: forwarder.sticky().clone(),
            forwarder,
        }
    }
}

// ── Shared helpers ────────────────────────────────────────────────────────────

/// Upstream statuses are passed through; anything unrepresentable becomes 502.
fn upstream_status(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY)
}

// Re-export handler functions for use in router setup.
pub use facilitator::{handle_settle, handle_supported, handle_verify};
pub use peers::{handle_health, handle_peers, handle_register};

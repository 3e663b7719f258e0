//! switchyard-services — the gateway's routing state and forwarding logic.

pub mod forward;
pub mod heartbeat;
pub mod peer;
pub mod sticky;
pub mod supported;

mod sweeper;
#[cfg(test)]
mod testing;

pub use forward::{
    build_fallback_order, select_peer, ForwardError, ForwardTimeouts, Forwarder, Operation,
    PeerResponse,
};
pub use heartbeat::{HeartbeatEmitter, KindsSource};
pub use peer::{PeerEntry, PeerRegistry};
pub use sticky::{StickyCounts, StickyRouter};
pub use supported::{aggregate_supported, dedup_kinds};

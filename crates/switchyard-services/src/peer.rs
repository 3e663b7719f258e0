//! Peer registry — facilitator nodes that announced themselves by heartbeat.
//!
//! The registry is a concurrent map from normalized base URL to PeerEntry,
//! populated by `POST /register` and read on every verify/settle request.
//! Entries expire `ttl` after their last heartbeat if not refreshed.
//!
//! Statically configured peers never live here; they are merged in by
//! `active_peers` at query time.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value;
use tokio::time::Instant;

use switchyard_core::normalize_peer_url;

use crate::sweeper::Sweeper;

/// A self-registered facilitator peer.
#[derive(Debug, Clone)]
pub struct PeerEntry {
    /// Normalized base URL, never ending in `/`.
    pub url: String,
    /// Capability descriptors from the last heartbeat, passed through as-is.
    pub kinds: Option<Vec<Value>>,
    /// When this entry was last refreshed. Used for TTL expiry.
    pub last_seen: Instant,
}

impl PeerEntry {
    /// Time since the last heartbeat.
    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.last_seen)
    }

    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.last_seen) >= ttl
    }
}

/// The peer registry — shared between the API handlers and the forwarder.
#[derive(Clone)]
pub struct PeerRegistry {
    peers: Arc<DashMap<String, PeerEntry>>,
    ttl: Duration,
    sweeper: Arc<Sweeper>,
}

impl PeerRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            peers: Arc::new(DashMap::new()),
            ttl,
            sweeper: Arc::new(Sweeper::default()),
        }
    }

    /// Insert or refresh a peer. Safe to call on every heartbeat.
    pub fn register(&self, url: &str, kinds: Option<Vec<Value>>) {
        let url = normalize_peer_url(url);
        let entry = PeerEntry {
            url: url.clone(),
            kinds,
            last_seen: Instant::now(),
        };
        if self.peers.insert(url.clone(), entry).is_none() {
            tracing::info!(peer = %url, "peer registered");
        } else {
            tracing::debug!(peer = %url, "peer heartbeat");
        }
    }

    /// Static peers (in configured order) followed by live registered
    /// peers (sorted by URL), normalized and deduplicated.
    pub fn active_peers(&self, static_peers: &[String]) -> Vec<String> {
        let now = Instant::now();
        let mut registered: Vec<String> = self
            .peers
            .iter()
            .filter(|e| !e.value().is_expired(now, self.ttl))
            .map(|e| e.key().clone())
            .collect();
        registered.sort();

        let mut seen = HashSet::new();
        static_peers
            .iter()
            .map(|url| normalize_peer_url(url))
            .chain(registered)
            .filter(|url| seen.insert(url.clone()))
            .collect()
    }

    /// Remove entries that have not been refreshed within the TTL.
    /// Returns how many were removed.
    pub fn cleanup(&self) -> usize {
        sweep(&self.peers, self.ttl)
    }

    /// Sweep expired entries every `every` in the background.
    pub fn start_sweeper(&self, every: Duration) {
        let peers = self.peers.clone();
        let ttl = self.ttl;
        self.sweeper.start(every, move || {
            sweep(&peers, ttl);
        });
    }

    pub fn is_sweeping(&self) -> bool {
        self.sweeper.is_running()
    }

    /// Stop the background sweep and forget every registered peer.
    pub fn destroy(&self) {
        self.sweeper.stop();
        self.peers.clear();
    }

    /// Snapshot of registered peers, sorted by URL.
    pub fn entries(&self) -> Vec<PeerEntry> {
        let mut entries: Vec<PeerEntry> = self.peers.iter().map(|e| e.value().clone()).collect();
        entries.sort_by(|a, b| a.url.cmp(&b.url));
        entries
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

fn sweep(peers: &DashMap<String, PeerEntry>, ttl: Duration) -> usize {
    let now = Instant::now();
    let before = peers.len();
    peers.retain(|_, entry| !entry.is_expired(now, ttl));
    let removed = before.saturating_sub(peers.len());
    if removed > 0 {
        tracing::debug!(removed, "expired peer registry entries");
    }
    removed
}

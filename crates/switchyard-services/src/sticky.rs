//! Sticky routing — remembers which peer verified a transaction so the
//! settle leg can go back to the same peer.
//!
//! Two keyspaces:
//! - payer:       lowercased sender identity (EVM-style authorizations)
//! - fingerprint: BLAKE3 of an opaque credential, for protocols that carry
//!                no sender field (legacy header strings, raw transactions)
//!
//! A hit is a preference only. Every caller keeps its own fallback path.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;

use switchyard_core::wire::{fingerprint, payer_from_response};
use switchyard_core::ForwardRequest;

use crate::sweeper::Sweeper;

#[derive(Debug, Clone)]
struct StickyEntry {
    peer: String,
    expires_at: Instant,
}

impl StickyEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

type StickyMap = DashMap<String, StickyEntry>;

/// Live entry counts per keyspace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StickyCounts {
    pub payers: usize,
    pub fingerprints: usize,
}

#[derive(Clone)]
pub struct StickyRouter {
    by_payer: Arc<StickyMap>,
    by_fingerprint: Arc<StickyMap>,
    ttl: Duration,
    sweeper: Arc<Sweeper>,
}

impl StickyRouter {
    pub fn new(ttl: Duration) -> Self {
        Self {
            by_payer: Arc::new(DashMap::new()),
            by_fingerprint: Arc::new(DashMap::new()),
            ttl,
            sweeper: Arc::new(Sweeper::default()),
        }
    }

    /// Bind this transaction to `peer` under every key that can be extracted.
    pub fn record_selection(&self, peer: &str, request: &ForwardRequest, verify_response: &Value) {
        let expires_at = Instant::now() + self.ttl;
        let entry = StickyEntry {
            peer: peer.to_string(),
            expires_at,
        };

        let payer = payer_from_response(verify_response).or_else(|| request.payer());
        if let Some(payer) = payer {
            self.by_payer.insert(payer.to_lowercase(), entry.clone());
        }

        let credential = request.credential();
        if let Some(credential) = credential {
            self.by_fingerprint.insert(fingerprint(credential), entry);
        }

        if payer.is_none() && credential.is_none() {
            tracing::debug!(peer, "no sticky key in verify request");
        } else {
            tracing::debug!(
                peer,
                by_payer = payer.is_some(),
                by_fingerprint = credential.is_some(),
                "sticky selection recorded"
            );
        }
    }

    /// The peer that verified this transaction, if still remembered.
    pub fn preferred_peer(&self, request: &ForwardRequest) -> Option<String> {
        request
            .payer()
            .and_then(|payer| lookup(&self.by_payer, &payer.to_lowercase()))
            .or_else(|| {
                request
                    .credential()
                    .and_then(|credential| lookup(&self.by_fingerprint, &fingerprint(credential)))
            })
    }

    /// Remove expired entries from both keyspaces. Returns how many were removed.
    pub fn cleanup(&self) -> usize {
        sweep(&self.by_payer, &self.by_fingerprint)
    }

    /// Sweep expired entries every `every` in the background.
    pub fn start_sweeper(&self, every: Duration) {
        let by_payer = self.by_payer.clone();
        let by_fingerprint = self.by_fingerprint.clone();
        self.sweeper.start(every, move || {
            sweep(&by_payer, &by_fingerprint);
        });
    }

    pub fn is_sweeping(&self) -> bool {
        self.sweeper.is_running()
    }

    /// Stop the background sweep and drop every binding.
    pub fn destroy(&self) {
        self.sweeper.stop();
        self.by_payer.clear();
        self.by_fingerprint.clear();
    }

    pub fn len(&self) -> StickyCounts {
        StickyCounts {
            payers: self.by_payer.len(),
            fingerprints: self.by_fingerprint.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.by_payer.is_empty() && self.by_fingerprint.is_empty()
    }
}

/// Read a key, discarding it if it has expired.
fn lookup(map: &StickyMap, key: &str) -> Option<String> {
    let now = Instant::now();
    // The shard guard must be released before `remove_if` touches the same shard.
    let hit = map.get(key).map(|e| e.value().clone());
    match hit {
        Some(entry) if !entry.is_expired(now) => Some(entry.peer),
        Some(_) => {
            map.remove_if(key, |_, e| e.is_expired(now));
            None
        }
        None => None,
    }
}

fn sweep(by_payer: &StickyMap, by_fingerprint: &StickyMap) -> usize {
    let now = Instant::now();
    let before = by_payer.len() + by_fingerprint.len();
    by_payer.retain(|_, e| !e.is_expired(now));
    by_fingerprint.retain(|_, e| !e.is_expired(now));
    let removed = before.saturating_sub(by_payer.len() + by_fingerprint.len());
    if removed > 0 {
        tracing::debug!(removed, "expired sticky selections");
    }
    removed
}

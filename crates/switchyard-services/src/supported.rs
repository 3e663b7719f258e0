//! Capability aggregation — the union of every active peer's `/supported`.

use std::time::Duration;

use futures::future::join_all;
use serde_json::Value;

use switchyard_core::wire::SupportedResponse;

/// Query every peer concurrently and merge their kinds.
///
/// A peer that fails, times out, or answers with a non-success status
/// contributes nothing; it never aborts the aggregation.
pub async fn aggregate_supported(
    client: &reqwest::Client,
    peers: &[String],
    timeout: Duration,
) -> Vec<Value> {
    let lists = join_all(peers.iter().map(|peer| fetch_kinds(client, peer, timeout))).await;
    dedup_kinds(lists.into_iter().flatten())
}

async fn fetch_kinds(client: &reqwest::Client, peer: &str, timeout: Duration) -> Vec<Value> {
    let url = format!("{}/supported", peer);
    let resp = match client.get(&url).timeout(timeout).send().await {
        Ok(resp) => resp,
        Err(e) => {
            tracing::debug!(peer, error = %e, "supported request failed");
            return Vec::new();
        }
    };

    if !resp.status().is_success() {
        tracing::debug!(peer, status = resp.status().as_u16(), "supported returned error status");
        return Vec::new();
    }

    match resp.json::<SupportedResponse>().await {
        Ok(body) => body.kinds,
        Err(e) => {
            tracing::debug!(peer, error = %e, "supported response malformed");
            Vec::new()
        }
    }
}

/// Drop exact structural duplicates, keeping first occurrences in order.
pub fn dedup_kinds(kinds: impl IntoIterator<Item = Value>) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::new();
    for kind in kinds {
        if !out.contains(&kind) {
            out.push(kind);
        }
    }
    out
}

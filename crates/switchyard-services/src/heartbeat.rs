//! Heartbeat emitter — runs on a facilitator node and keeps it registered
//! with one or more gateways.
//!
//! Fires once immediately, then every interval. Each tick POSTs
//! `{url, kinds}` to `{gateway}/register` for every gateway. Failures are
//! logged and otherwise ignored; the next tick simply tries again.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde_json::Value;
use tokio::task::JoinHandle;

use switchyard_core::config::HeartbeatConfig;
use switchyard_core::normalize_peer_url;
use switchyard_core::wire::RegisterRequest;

const POST_TIMEOUT: Duration = Duration::from_secs(10);

/// Supplies a fresh kinds list on every tick. `None` falls back to the
/// configured static kinds.
pub type KindsSource = Arc<dyn Fn() -> BoxFuture<'static, Option<Vec<Value>>> + Send + Sync>;

/// Handle to a running heartbeat loop. Dropping it stops the loop.
pub struct HeartbeatEmitter {
    task: JoinHandle<()>,
}

impl HeartbeatEmitter {
    /// Start announcing `config.self_url` to `config.gateways`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        client: reqwest::Client,
        config: &HeartbeatConfig,
        source: Option<KindsSource>,
    ) -> Self {
        Self::spawn(client, config, config.interval(), source)
    }

    /// Like `start`, without the interval floor.
    pub(crate) fn spawn(
        client: reqwest::Client,
        config: &HeartbeatConfig,
        every: Duration,
        source: Option<KindsSource>,
    ) -> Self {
        let self_url = config.self_url.clone();
        let gateways: Arc<Vec<String>> = Arc::new(
            config
                .gateways
                .iter()
                .map(|g| format!("{}/register", normalize_peer_url(g)))
                .collect(),
        );
        let static_kinds = (!config.kinds.is_empty()).then(|| config.kinds.clone());

        tracing::info!(
            url = %self_url,
            gateways = gateways.len(),
            interval_ms = every.as_millis() as u64,
            "heartbeat starting"
        );

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;

                let kinds = match &source {
                    Some(source) => source().await.or_else(|| static_kinds.clone()),
                    None => static_kinds.clone(),
                };
                let body = RegisterRequest {
                    url: self_url.clone(),
                    kinds,
                };

                // Posts run detached so stopping the loop never cuts one off.
                for register_url in gateways.iter() {
                    tokio::spawn(send_heartbeat(client.clone(), register_url.clone(), body.clone()));
                }
            }
        });

        Self { task }
    }

    /// Suppress future ticks. Heartbeats already in flight still complete.
    pub fn stop(&self) {
        self.task.abort();
    }

    pub fn is_stopped(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for HeartbeatEmitter {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn send_heartbeat(client: reqwest::Client, register_url: String, body: RegisterRequest) {
    match client
        .post(&register_url)
        .timeout(POST_TIMEOUT)
        .json(&body)
        .send()
        .await
    {
        Ok(resp) if resp.status().is_success() => {
            tracing::debug!(gateway = %register_url, "heartbeat accepted");
        }
        Ok(resp) => {
            tracing::warn!(gateway = %register_url, status = resp.status().as_u16(), "heartbeat rejected");
        }
        Err(e) => {
            tracing::warn!(gateway = %register_url, error = %e, "heartbeat failed");
        }
    }
}

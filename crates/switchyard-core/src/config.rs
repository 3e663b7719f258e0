//! Configuration system for Switchyard.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $SWITCHYARD_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/switchyard/config.toml
//!   3. ~/.config/switchyard/config.toml

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

/// Heartbeats may not run faster than this.
pub const MIN_HEARTBEAT_INTERVAL_MS: u64 = 5_000;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Verbose logging of swallowed upstream failures.
    pub debug: bool,
    pub network: NetworkConfig,
    pub peers: PeersConfig,
    pub routing: RoutingConfig,
    pub heartbeat: HeartbeatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub listen_addr: String,
    pub port: u16,
    /// Route prefix, e.g. "/facilitator". Empty = serve at the root.
    pub base_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PeersConfig {
    /// Facilitator base URLs that are always active and never expire.
    pub static_peers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Registered peers expire this long after their last heartbeat.
    pub registry_ttl_ms: u64,
    /// Lifetime of a verify→settle sticky binding.
    pub selection_ttl_ms: u64,
    /// Period of the background sweeps.
    pub cleanup_interval_ms: u64,
    pub verify_timeout_ms: u64,
    pub settle_timeout_ms: u64,
    pub supported_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Base URL this node announces, e.g. "http://10.0.0.5:4021".
    pub self_url: String,
    /// Gateway base URLs to announce to (including any base path).
    pub gateways: Vec<String>,
    pub interval_ms: u64,
    /// Kinds announced when no live source is supplied.
    pub kinds: Vec<Value>,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1".to_string(),
            port: 4020,
            base_path: String::new(),
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            registry_ttl_ms: 120_000,
            selection_ttl_ms: 60_000,
            cleanup_interval_ms: 30_000,
            verify_timeout_ms: 10_000,
            settle_timeout_ms: 30_000,
            supported_timeout_ms: 10_000,
        }
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            self_url: String::new(),
            gateways: Vec::new(),
            interval_ms: 30_000,
            kinds: Vec::new(),
        }
    }
}

impl RoutingConfig {
    pub fn registry_ttl(&self) -> Duration {
        Duration::from_millis(self.registry_ttl_ms)
    }

    pub fn selection_ttl(&self) -> Duration {
        Duration::from_millis(self.selection_ttl_ms)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }

    pub fn verify_timeout(&self) -> Duration {
        Duration::from_millis(self.verify_timeout_ms)
    }

    pub fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }

    pub fn supported_timeout(&self) -> Duration {
        Duration::from_millis(self.supported_timeout_ms)
    }
}

impl HeartbeatConfig {
    /// Configured interval, clamped to the 5s floor.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(MIN_HEARTBEAT_INTERVAL_MS))
    }
}

impl NetworkConfig {
    /// `""` for the root, otherwise `/segment[/segment…]` without a trailing slash.
    pub fn normalized_base_path(&self) -> String {
        normalize_base_path(&self.base_path)
    }
}

pub fn normalize_base_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("switchyard")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl GatewayConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            GatewayConfig::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("SWITCHYARD_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&GatewayConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply SWITCHYARD_* overrides. `lookup` is `std::env::var` in production.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("SWITCHYARD_DEBUG") {
            self.debug = v == "true" || v == "1";
        }
        if let Some(v) = lookup("SWITCHYARD_NETWORK__LISTEN_ADDR") {
            self.network.listen_addr = v;
        }
        if let Some(p) = lookup("SWITCHYARD_NETWORK__PORT").and_then(|v| v.parse().ok()) {
            self.network.port = p;
        }
        if let Some(v) = lookup("SWITCHYARD_NETWORK__BASE_PATH") {
            self.network.base_path = v;
        }
        if let Some(v) = lookup("SWITCHYARD_PEERS") {
            self.peers.static_peers = split_list(&v);
        }
        if let Some(v) = lookup("SWITCHYARD_HEARTBEAT__GATEWAYS") {
            self.heartbeat.gateways = split_list(&v);
        }
        if let Some(v) = lookup("SWITCHYARD_HEARTBEAT__SELF_URL") {
            self.heartbeat.self_url = v;
        }

        let routing = &mut self.routing;
        let millis = [
            ("SWITCHYARD_ROUTING__REGISTRY_TTL_MS", &mut routing.registry_ttl_ms),
            ("SWITCHYARD_ROUTING__SELECTION_TTL_MS", &mut routing.selection_ttl_ms),
            ("SWITCHYARD_ROUTING__CLEANUP_INTERVAL_MS", &mut routing.cleanup_interval_ms),
            ("SWITCHYARD_ROUTING__VERIFY_TIMEOUT_MS", &mut routing.verify_timeout_ms),
            ("SWITCHYARD_ROUTING__SETTLE_TIMEOUT_MS", &mut routing.settle_timeout_ms),
            ("SWITCHYARD_ROUTING__SUPPORTED_TIMEOUT_MS", &mut routing.supported_timeout_ms),
        ];
        for (key, slot) in millis {
            if let Some(ms) = lookup(key).and_then(|v| v.parse().ok()) {
                *slot = ms;
            }
        }
    }
}

/// Comma-separated list, blanks dropped.
fn split_list(v: &str) -> Vec<String> {
    v.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

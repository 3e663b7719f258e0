//! switchyard-core — shared wire shapes and configuration.
//! All other Switchyard crates depend on this one.

pub mod config;
pub mod wire;

pub use config::GatewayConfig;
pub use wire::{normalize_peer_url, ForwardRequest, RequestShapeError};

//! CLI command modules.

pub mod announce;
pub mod http;
pub mod peers;
pub mod supported;

//! Server configuration
//!
//! Every field has a default, so a config file only needs the keys it changes.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default listen address
pub const DEFAULT_ADDR: &str = "127.0.0.1:1234";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on
    pub addr: String,

    /// Capacity of the readiness event buffer
    pub max_events: usize,

    /// Upper bound on one readiness wait; None waits indefinitely
    pub poll_timeout_ms: Option<u64>,

    /// Log filter used when RUST_LOG is not set
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            addr: DEFAULT_ADDR.to_string(),
            max_events: 1024,
            poll_timeout_ms: Some(1000),
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn with_addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }
}

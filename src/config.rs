//! Daemon configuration (§6 Configuration defaults).
//!
//! Persisted as `config.json` in the control directory; owned exclusively by
//! the daemon (§5 Shared-resource policy). Loaded once at startup and
//! rewritten whenever `add_peer`/`remove_peer` succeed.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 7433;
pub const DEFAULT_AUTO_SHUTDOWN_SECS: u64 = 300;
pub const DEFAULT_HEARTBEAT_SECS: u64 = 15;

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_auto_shutdown() -> u64 {
    DEFAULT_AUTO_SHUTDOWN_SECS
}

fn default_heartbeat() -> u64 {
    DEFAULT_HEARTBEAT_SECS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub peers: Vec<String>,
    #[serde(default = "default_auto_shutdown", rename = "autoShutdownTimeout")]
    pub auto_shutdown_timeout_secs: u64,
    #[serde(default = "default_heartbeat", rename = "heartbeatInterval")]
    pub heartbeat_interval_secs: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            peers: Vec::new(),
            auto_shutdown_timeout_secs: DEFAULT_AUTO_SHUTDOWN_SECS,
            heartbeat_interval_secs: DEFAULT_HEARTBEAT_SECS,
        }
    }
}

impl DaemonConfig {
    /// Loads `config.json`, falling back to defaults if it's missing.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("failed to serialize config")?;
        std::fs::write(path, content).with_context(|| format!("failed to write config file {}", path.display()))
    }

    /// Appends a peer address if not already present, then persists.
    pub fn add_peer(&mut self, path: &Path, address: &str) -> Result<()> {
        if !self.peers.iter().any(|p| p == address) {
            self.peers.push(address.to_string());
            self.save(path)?;
        }
        Ok(())
    }

    pub fn remove_peer(&mut self, path: &Path, address: &str) -> Result<()> {
        let before = self.peers.len();
        self.peers.retain(|p| p != address);
        if self.peers.len() != before {
            self.save(path)?;
        }
        Ok(())
    }
}

/// Splits a `host[:port]` peer address (§4.D Address parsing). A trailing
/// `:<digits>` is taken as the port; anything else (including `:0` or a
/// non-numeric suffix) falls back to the default port with the full string
/// as the host.
pub fn parse_peer_address(address: &str) -> (String, u16) {
    if let Some((host, port_str)) = address.rsplit_once(':') {
        if let Ok(port) = port_str.parse::<u16>() {
            if port != 0 {
                return (host.to_string(), port);
            }
        }
    }
    (address.to_string(), DEFAULT_PORT)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod config_tests;

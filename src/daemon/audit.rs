//! Append-only relay audit log (§4.E).

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub timestamp: String,
    pub peer: String,
    pub action: String,
    pub data: Value,
    pub result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditEntry {
    pub fn relay(peer: &str, target_session_id: &str, result: &str, error: Option<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            peer: peer.to_string(),
            action: "relay".to_string(),
            data: serde_json::json!({ "targetSessionId": target_session_id }),
            result: result.to_string(),
            error,
        }
    }
}

/// Appends one JSON line to `audit.log`. Failures are logged by the caller,
/// not propagated as a relay failure — the audit trail is best-effort.
pub fn append(path: &Path, entry: &AuditEntry) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open audit log {}", path.display()))?;
    let line = serde_json::to_string(entry).context("failed to serialize audit entry")?;
    writeln!(file, "{line}").context("failed to append audit entry")
}

#[cfg(test)]
#[path = "tests/audit_tests.rs"]
mod audit_tests;

//! Control directory layout (§4.A, §6).
//!
//! ```text
//! .pi/remote-control/
//!   daemon.sock            daemon IPC (mode 0600)
//!   daemon.pid             textual PID of live daemon
//!   config.json            { port, peers, autoShutdownTimeout, heartbeatInterval }
//!   audit.log              one JSON object per line
//!   names/<sessionId>      text file, persisted auto-name
//!   <sessionId>.sock       per-session IPC
//!   <alias>.alias          symlink -> <sessionId>.sock
//! ```
//!
//! The root is overridable via `PI_MESH_CONTROL_DIR` so tests and concurrent
//! local development never collide with a real `~/.pi/remote-control/`.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::validate::validate_safe_id;
use crate::error::ErrorKind;

const ENV_OVERRIDE: &str = "PI_MESH_CONTROL_DIR";
const DEFAULT_DIR: &str = ".pi/remote-control";
const SOCK_EXT: &str = "sock";
const ALIAS_EXT: &str = "alias";

#[derive(Debug, Clone)]
pub struct ControlDir {
    root: PathBuf,
}

/// A reachable endpoint node found while scanning the control directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointNode {
    pub session_id: String,
    pub socket_path: PathBuf,
}

impl ControlDir {
    /// Resolves the control directory root: `PI_MESH_CONTROL_DIR` if set,
    /// else `<home>/.pi/remote-control`. Creates it if missing.
    pub fn resolve() -> Result<Self> {
        let root = match std::env::var_os(ENV_OVERRIDE) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::home_dir()
                .context("could not determine home directory for the control directory")?
                .join(DEFAULT_DIR),
        };
        let dir = Self { root };
        dir.ensure_exists()?;
        Ok(dir)
    }

    /// Builds a `ControlDir` rooted at an explicit path without consulting
    /// the environment; used by tests and `--control-dir`.
    pub fn at(root: impl Into<PathBuf>) -> Result<Self> {
        let dir = Self { root: root.into() };
        dir.ensure_exists()?;
        Ok(dir)
    }

    pub fn ensure_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create control directory {}", self.root.display()))?;
        std::fs::create_dir_all(self.names_dir())
            .with_context(|| "failed to create names/ directory".to_string())?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn daemon_socket_path(&self) -> PathBuf {
        self.root.join("daemon.sock")
    }

    pub fn daemon_pid_path(&self) -> PathBuf {
        self.root.join("daemon.pid")
    }

    /// Advisory lock file guarding the self-spawn race (§4.E "Startup and
    /// self-spawn"): whichever thin client wins `try_lock_exclusive` on this
    /// file is the one that actually spawns the daemon; losers just wait for
    /// `daemon.sock` to appear.
    pub fn daemon_lock_path(&self) -> PathBuf {
        self.root.join("daemon.lock")
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.json")
    }

    pub fn audit_log_path(&self) -> PathBuf {
        self.root.join("audit.log")
    }

    pub fn names_dir(&self) -> PathBuf {
        self.root.join("names")
    }

    pub fn name_path(&self, session_id: &str) -> PathBuf {
        self.names_dir().join(session_id)
    }

    pub fn endpoint_socket_path(&self, session_id: &str) -> PathBuf {
        self.root.join(format!("{session_id}.{SOCK_EXT}"))
    }

    pub fn alias_path(&self, alias: &str) -> PathBuf {
        self.root.join(format!("{alias}.{ALIAS_EXT}"))
    }

    /// Reads the persisted auto-name for a session, if any.
    pub fn read_persisted_name(&self, session_id: &str) -> Option<String> {
        std::fs::read_to_string(self.name_path(session_id))
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Persists the (usually whimsical) auto-name for a session.
    pub fn persist_name(&self, session_id: &str, name: &str) -> Result<()> {
        std::fs::write(self.name_path(session_id), name)
            .with_context(|| format!("failed to persist name for session {session_id}"))
    }

    /// Lists every reachable-looking endpoint node (`*.sock`, excluding the
    /// daemon's own socket) currently on disk. Liveness is not checked here —
    /// that's the watcher's probe.
    pub fn list_endpoint_nodes(&self) -> Result<Vec<EndpointNode>> {
        let mut nodes = Vec::new();
        let entries = match std::fs::read_dir(&self.root) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(nodes),
            Err(e) => return Err(e).context("failed to read control directory"),
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(session_id) = file_name.strip_suffix(".sock") else {
                continue;
            };
            if session_id == "daemon" {
                continue;
            }
            if validate_safe_id(session_id).is_err() {
                continue;
            }
            nodes.push(EndpointNode {
                session_id: session_id.to_string(),
                socket_path: path,
            });
        }
        nodes.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        Ok(nodes)
    }

    /// Resolves an alias to a session id by reading the `<alias>.alias`
    /// symlink fresh off disk. Never cached, per the design note that alias
    /// resolution must not serve stale redirects after a rename.
    pub fn resolve_alias(&self, alias: &str) -> Result<Option<String>, ErrorKind> {
        validate_safe_id(alias)?;
        let link = self.alias_path(alias);
        let target = match std::fs::read_link(&link) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(_) => return Ok(None),
        };
        let Some(file_name) = target.file_name().and_then(|n| n.to_str()) else {
            return Ok(None);
        };
        let Some(session_id) = file_name.strip_suffix(".sock") else {
            return Ok(None);
        };
        Ok(Some(session_id.to_string()))
    }

    /// Resolves either a bare session id or an alias: session ids take
    /// priority only if no alias of the same name exists, matching the
    /// reference behavior of trying the direct endpoint node first.
    pub fn resolve_target(&self, id_or_alias: &str) -> Result<Option<String>, ErrorKind> {
        validate_safe_id(id_or_alias)?;
        if self.endpoint_socket_path(id_or_alias).exists() {
            return Ok(Some(id_or_alias.to_string()));
        }
        self.resolve_alias(id_or_alias)
    }

    /// Creates (or repoints) an alias symlink to the given session, using a
    /// bare relative filename as the target per §4.A.
    pub fn create_alias(&self, alias: &str, session_id: &str) -> Result<(), ErrorKind> {
        validate_safe_id(alias)?;
        validate_safe_id(session_id)?;
        let link = self.alias_path(alias);
        let target = format!("{session_id}.sock");
        if let Ok(existing) = std::fs::read_link(&link) {
            if existing.to_str() == Some(target.as_str()) {
                return Ok(());
            }
            let _ = std::fs::remove_file(&link);
        }
        #[cfg(unix)]
        std::os::unix::fs::symlink(&target, &link)
            .map_err(|e| ErrorKind::Transport(format!("failed to create alias {alias:?}: {e}")))?;
        Ok(())
    }

    pub fn remove_alias(&self, alias: &str) -> Result<()> {
        let link = self.alias_path(alias);
        match std::fs::remove_file(&link) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("failed to remove alias"),
        }
    }

    /// Scans the directory for every `.alias` symlink currently pointing at
    /// `session_id`, freshly re-derived rather than cached (§9).
    pub fn aliases_for(&self, session_id: &str) -> Result<Vec<String>> {
        let target = format!("{session_id}.sock");
        let mut aliases = Vec::new();
        let entries = match std::fs::read_dir(&self.root) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(aliases),
            Err(e) => return Err(e).context("failed to read control directory"),
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(alias) = file_name.strip_suffix(".alias") else {
                continue;
            };
            if let Ok(link_target) = std::fs::read_link(&path) {
                if link_target.to_str() == Some(target.as_str()) {
                    aliases.push(alias.to_string());
                }
            }
        }
        aliases.sort();
        Ok(aliases)
    }
}

#[cfg(test)]
#[path = "tests/control_dir_tests.rs"]
mod control_dir_tests;

//! Closed, wire-facing error taxonomy.
//!
//! Every command handler at a listener's request boundary maps its failure into
//! one of these variants before it reaches a client. Internal plumbing (file I/O,
//! config loading, JSON parsing that never reaches a wire response) instead
//! propagates with `anyhow::Result` and `.context(...)`.

use thiserror::Error;

/// The ten wire-facing error kinds a relay, endpoint, or control-plane request can fail with.
#[derive(Debug, Clone, Error)]
pub enum ErrorKind {
    #[error("invalid request: {0}")]
    Parse(String),

    #[error("message exceeds {0} bytes")]
    SizeExceeded(usize),

    #[error("session not found")]
    NotFound,

    #[error("session is on a disconnected peer")]
    PeerUnreachable,

    #[error("Relay timeout after {0}ms")]
    Timeout(u64),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("session is busy")]
    Busy,

    #[error("{0}")]
    Unsupported(String),

    #[error("{0}")]
    Backend(String),

    #[error("{0}")]
    Transport(String),
}

impl ErrorKind {
    /// The short machine-readable tag used in logs and tests; the `Display` impl
    /// above is the human-readable wire string that lands in `error:`.
    pub fn tag(&self) -> &'static str {
        match self {
            ErrorKind::Parse(_) => "parse",
            ErrorKind::SizeExceeded(_) => "size_exceeded",
            ErrorKind::NotFound => "not_found",
            ErrorKind::PeerUnreachable => "peer_unreachable",
            ErrorKind::Timeout(_) => "timeout",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Busy => "busy",
            ErrorKind::Unsupported(_) => "unsupported",
            ErrorKind::Backend(_) => "backend",
            ErrorKind::Transport(_) => "transport",
        }
    }
}

#[cfg(test)]
#[path = "tests/error_tests.rs"]
mod error_tests;

//! Session RPC frame types (§4.B, §6).
//!
//! Requests are one JSON object per line with a `type` tag selecting the
//! command, plus an optional top-level `id` echoed back in the response so
//! callers can correlate without relying on connection order.

use serde::{Deserialize, Serialize};

pub type SessionId = String;

/// `{ sessionId, name, aliases }` — the *name* is the primary display label,
/// *aliases* are every alternate name that also resolves to this session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub session_id: SessionId,
    pub name: String,
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendMode {
    #[default]
    Steer,
    FollowUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscribeEvent {
    TurnEnd,
}

/// The closed tagged union of session commands (§4.B). Unknown `type` values
/// fail to deserialize rather than being routed anywhere (§9).
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionCommand {
    Send {
        message: String,
        #[serde(default)]
        mode: SendMode,
    },
    GetMessage,
    GetSummary,
    Clear {
        #[serde(default)]
        summarize: bool,
    },
    Abort,
    Subscribe {
        event: SubscribeEvent,
    },
}

impl SessionCommand {
    pub fn name(&self) -> &'static str {
        match self {
            SessionCommand::Send { .. } => "send",
            SessionCommand::GetMessage => "get_message",
            SessionCommand::GetSummary => "get_summary",
            SessionCommand::Clear { .. } => "clear",
            SessionCommand::Abort => "abort",
            SessionCommand::Subscribe { .. } => "subscribe",
        }
    }
}

/// A parsed request line: the tagged command plus the sibling `id` field the
/// tag doesn't capture.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionRequest {
    #[serde(flatten)]
    pub command: SessionCommand,
    #[serde(default)]
    pub id: Option<String>,
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod protocol_tests;

//! The agent collaborator contract (§4.B).
//!
//! The core never knows which concrete coding agent it's embedded in — it
//! only calls four operations plus a read-only view. No concrete agent
//! implementation belongs in this crate; [`InMemoryAgent`] is the in-memory
//! stand-in used by the `endpoint` CLI mode and by tests.

use async_trait::async_trait;
use tokio::sync::{broadcast, Mutex};

use crate::error::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliverAs {
    Steer,
    FollowUp,
}

/// Fires once per completed turn, carrying the trailing assistant message.
#[derive(Debug, Clone)]
pub struct TurnEndEvent {
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewindOutcome {
    pub already_at_root: bool,
}

#[async_trait]
pub trait AgentCollaborator: Send + Sync {
    /// Delivers a message to the current turn. `trigger_turn` is true when
    /// the session was idle and this starts a fresh turn; otherwise
    /// `deliver_as` selects whether it interrupts (`Steer`) or queues
    /// (`FollowUp`) behind the turn in progress.
    async fn deliver(
        &self,
        message: String,
        trigger_turn: bool,
        deliver_as: DeliverAs,
    ) -> Result<(), ErrorKind>;

    /// Cancels any in-progress turn. Idempotent.
    async fn abort(&self);

    /// Rewinds the conversation branch to its root entry.
    async fn rewind_to_root(&self) -> RewindOutcome;

    /// The most recent assistant text message on the current branch.
    async fn last_assistant_message(&self) -> Option<String>;

    /// Summarizes the span since the last user prompt.
    async fn summarize_since_last_prompt(&self) -> Result<String, ErrorKind>;

    async fn is_idle(&self) -> bool;

    /// The session name the agent currently advertises, if any, for alias
    /// maintenance (§4.B Alias maintenance).
    async fn display_name(&self) -> Option<String>;

    /// A fresh subscription to this agent's turn-end hook.
    fn subscribe_turn_end(&self) -> broadcast::Receiver<TurnEndEvent>;
}

/// In-memory stand-in agent used by `pi-mesh endpoint` and by tests. Every
/// `deliver` synchronously produces a canned reply and fires one turn-end
/// event; there is no real model behind it.
pub struct InMemoryAgent {
    busy: Mutex<bool>,
    branch: Mutex<Vec<String>>,
    name: Mutex<Option<String>>,
    turn_end_tx: broadcast::Sender<TurnEndEvent>,
    summarization_available: bool,
}

impl InMemoryAgent {
    pub fn new(name: Option<String>) -> Self {
        let (turn_end_tx, _) = broadcast::channel(16);
        Self {
            busy: Mutex::new(false),
            branch: Mutex::new(Vec::new()),
            name: Mutex::new(name),
            turn_end_tx,
            summarization_available: true,
        }
    }

    /// Builds a stand-in with summarization disabled, for exercising the
    /// `backend` error path of `get_summary`.
    pub fn without_summarization(name: Option<String>) -> Self {
        Self {
            summarization_available: false,
            ..Self::new(name)
        }
    }
}

#[async_trait]
impl AgentCollaborator for InMemoryAgent {
    async fn deliver(
        &self,
        message: String,
        trigger_turn: bool,
        deliver_as: DeliverAs,
    ) -> Result<(), ErrorKind> {
        if message.is_empty() {
            return Err(ErrorKind::Parse("message must not be empty".into()));
        }
        *self.busy.lock().await = true;
        let tag = if trigger_turn {
            "turn"
        } else {
            match deliver_as {
                DeliverAs::Steer => "steer",
                DeliverAs::FollowUp => "follow_up",
            }
        };
        let reply = format!("[{tag}] acknowledged: {message}");
        self.branch.lock().await.push(reply.clone());
        *self.busy.lock().await = false;
        let _ = self.turn_end_tx.send(TurnEndEvent {
            message: Some(reply),
        });
        Ok(())
    }

    async fn abort(&self) {
        *self.busy.lock().await = false;
    }

    async fn rewind_to_root(&self) -> RewindOutcome {
        let mut branch = self.branch.lock().await;
        let already_at_root = branch.is_empty();
        branch.clear();
        RewindOutcome { already_at_root }
    }

    async fn last_assistant_message(&self) -> Option<String> {
        self.branch.lock().await.last().cloned()
    }

    async fn summarize_since_last_prompt(&self) -> Result<String, ErrorKind> {
        if !self.summarization_available {
            return Err(ErrorKind::Backend(
                "no summarization model or key available".into(),
            ));
        }
        let branch = self.branch.lock().await;
        if branch.is_empty() {
            return Err(ErrorKind::Backend("no messages in span to summarize".into()));
        }
        Ok(format!("summary of {} message(s)", branch.len()))
    }

    async fn is_idle(&self) -> bool {
        !*self.busy.lock().await
    }

    async fn display_name(&self) -> Option<String> {
        self.name.lock().await.clone()
    }

    fn subscribe_turn_end(&self) -> broadcast::Receiver<TurnEndEvent> {
        self.turn_end_tx.subscribe()
    }
}

#[cfg(test)]
#[path = "tests/agent_tests.rs"]
mod agent_tests;

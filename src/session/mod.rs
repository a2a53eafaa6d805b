//! Session control (§4.B): the per-agent IPC endpoint and its wire protocol.

pub mod agent;
pub mod endpoint;
pub mod protocol;

pub use agent::{AgentCollaborator, DeliverAs, InMemoryAgent, RewindOutcome, TurnEndEvent};
pub use endpoint::Endpoint;
pub use protocol::{SendMode, SessionCommand, SessionId, SessionInfo, SessionRequest, SubscribeEvent};

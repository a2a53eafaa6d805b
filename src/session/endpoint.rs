//! The session endpoint (§4.B): one local IPC listener per agent session.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::json;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::naming::ControlDir;
use crate::wire::{ErrorFrame, EventFrame, FrameError, FrameReader, ResponseFrame};

use super::agent::{AgentCollaborator, DeliverAs, TurnEndEvent};
use super::protocol::{SendMode, SessionCommand, SessionRequest};

const ALIAS_RECONCILE_INTERVAL: Duration = Duration::from_secs(1);

pub struct Endpoint {
    control_dir: ControlDir,
    session_id: String,
    agent: Arc<dyn AgentCollaborator>,
    last_known_name: Mutex<Option<String>>,
}

impl Endpoint {
    pub fn new(control_dir: ControlDir, session_id: String, agent: Arc<dyn AgentCollaborator>) -> Arc<Self> {
        Arc::new(Self {
            control_dir,
            session_id,
            agent,
            last_known_name: Mutex::new(None),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Binds the endpoint socket and serves connections until the listener
    /// errors or the process is torn down. Cleans up its socket node and any
    /// alias links pointing at it on the way out (§3 Lifecycles).
    pub async fn run(self: Arc<Self>) -> Result<()> {
        let socket_path = self.control_dir.endpoint_socket_path(&self.session_id);
        if socket_path.exists() {
            let _ = std::fs::remove_file(&socket_path);
        }
        let listener = UnixListener::bind(&socket_path)
            .with_context(|| format!("failed to bind endpoint socket {}", socket_path.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&socket_path, std::fs::Permissions::from_mode(0o600))
                .context("failed to chmod endpoint socket")?;
        }
        info!(session_id = %self.session_id, path = %socket_path.display(), "endpoint listening");

        let reconcile_handle = {
            let endpoint = self.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(ALIAS_RECONCILE_INTERVAL);
                loop {
                    interval.tick().await;
                    endpoint.reconcile_alias().await;
                }
            })
        };

        let result = self.clone().accept_loop(listener).await;

        reconcile_handle.abort();
        let _ = std::fs::remove_file(&socket_path);
        for alias in self.control_dir.aliases_for(&self.session_id).unwrap_or_default() {
            let _ = self.control_dir.remove_alias(&alias);
        }
        result
    }

    async fn accept_loop(self: Arc<Self>, listener: UnixListener) -> Result<()> {
        loop {
            let (stream, _) = listener.accept().await?;
            let endpoint = self.clone();
            tokio::spawn(async move {
                if let Err(e) = endpoint.handle_connection(stream).await {
                    debug!(error = %e, "endpoint connection ended");
                }
            });
        }
    }

    /// Re-asserts the alias symlink mirroring the agent's self-reported name
    /// (§4.B Alias maintenance). Best-effort: failures here must never fail
    /// the RPC that triggered them.
    async fn reconcile_alias(&self) {
        let current = self.agent.display_name().await;
        let mut last_known = self.last_known_name.lock().await;
        if *last_known == current {
            if let Some(name) = &current {
                let _ = self.control_dir.create_alias(name, &self.session_id);
            }
            return;
        }
        if let Some(old) = last_known.take() {
            let _ = self.control_dir.remove_alias(&old);
        }
        if let Some(name) = &current {
            let _ = self.control_dir.create_alias(name, &self.session_id);
        }
        *last_known = current;
    }

    async fn handle_connection(self: Arc<Self>, stream: UnixStream) -> Result<()> {
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = FrameReader::new(read_half);
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        let writer_task = tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            while let Some(line) = rx.recv().await {
                if write_half.write_all(format!("{line}\n").as_bytes()).await.is_err() {
                    break;
                }
            }
        });

        loop {
            let frame = match reader.next_frame().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(FrameError::TooLarge) => {
                    let _ = tx.send(ErrorFrame::size_exceeded().to_line());
                    break;
                }
                Err(FrameError::Io(_)) => break,
            };

            let request: SessionRequest = match serde_json::from_str(&frame) {
                Ok(r) => r,
                Err(e) => {
                    let resp = ResponseFrame::err("unknown", format!("invalid request: {e}"), None);
                    let _ = tx.send(resp.to_line());
                    continue;
                }
            };

            let response = self.handle_command(&request, tx.clone()).await;
            let _ = tx.send(response.to_line());
            self.reconcile_alias().await;
        }

        drop(tx);
        let _ = writer_task.await;
        Ok(())
    }

    async fn handle_command(
        &self,
        request: &SessionRequest,
        tx: mpsc::UnboundedSender<String>,
    ) -> ResponseFrame {
        let command_name = request.command.name();
        let id = request.id.clone();

        match &request.command {
            SessionCommand::Send { message, mode } => {
                if message.is_empty() {
                    return ResponseFrame::err(command_name, "message must not be empty", id);
                }
                let idle = self.agent.is_idle().await;
                let deliver_as = match mode {
                    SendMode::Steer => DeliverAs::Steer,
                    SendMode::FollowUp => DeliverAs::FollowUp,
                };
                match self.agent.deliver(message.clone(), idle, deliver_as).await {
                    Ok(()) => ResponseFrame::ok(command_name, Some(json!({"delivered": true})), id),
                    Err(e) => ResponseFrame::err(command_name, e.to_string(), id),
                }
            }
            SessionCommand::GetMessage => {
                let message = self.agent.last_assistant_message().await;
                ResponseFrame::ok(command_name, Some(json!({ "message": message })), id)
            }
            SessionCommand::GetSummary => match self.agent.summarize_since_last_prompt().await {
                Ok(summary) => ResponseFrame::ok(command_name, Some(json!({ "summary": summary })), id),
                Err(e) => ResponseFrame::err(command_name, e.to_string(), id),
            },
            SessionCommand::Clear { summarize } => {
                if *summarize {
                    return ResponseFrame::err(
                        command_name,
                        "summarized clear is not supported via this channel",
                        id,
                    );
                }
                if !self.agent.is_idle().await {
                    return ResponseFrame::err(command_name, "session is busy", id);
                }
                let outcome = self.agent.rewind_to_root().await;
                ResponseFrame::ok(
                    command_name,
                    Some(json!({ "alreadyAtRoot": outcome.already_at_root })),
                    id,
                )
            }
            SessionCommand::Abort => {
                self.agent.abort().await;
                ResponseFrame::ok(command_name, None, id)
            }
            SessionCommand::Subscribe { .. } => {
                let subscription_id = uuid::Uuid::new_v4().to_string();
                let mut turn_end_rx = self.agent.subscribe_turn_end();
                let sub_id_for_task = subscription_id.clone();
                tokio::spawn(async move {
                    if let Ok(TurnEndEvent { message }) = turn_end_rx.recv().await {
                        let event = EventFrame::new("turn_end", Some(json!({ "message": message })))
                            .with_subscription(sub_id_for_task);
                        let _ = tx.send(event.to_line());
                    }
                });
                ResponseFrame::ok(
                    command_name,
                    Some(json!({ "subscriptionId": subscription_id })),
                    id,
                )
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/endpoint_tests.rs"]
mod endpoint_tests;

// ABOUTME: AgentHandle provides a cloneable Send+Sync front for any backend.
// ABOUTME: Uses channels to communicate with a worker task that owns the backend.

use crate::{AgentBackend, AgentEvent, ErrorCode, PromptRequest};
use anyhow::Result;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Commands sent from AgentHandle to the backend worker
#[derive(Debug)]
pub enum Command {
    Prompt {
        request: PromptRequest,
        event_tx: mpsc::Sender<AgentEvent>,
        reply: oneshot::Sender<Result<()>>,
    },
    Forget {
        session_id: String,
        reply: oneshot::Sender<Result<()>>,
    },
}

/// Send + Sync handle the router interacts with.
///
/// The worker runs every prompt in its own task, so a slow prompt for one
/// room never holds up another room.
#[derive(Clone)]
pub struct AgentHandle {
    tx: mpsc::Sender<Command>,
    name: &'static str,
}

impl AgentHandle {
    /// Create a new AgentHandle with the given command channel and backend name
    pub fn new(tx: mpsc::Sender<Command>, name: &'static str) -> Self {
        Self { tx, name }
    }

    /// Spawn a worker task for `backend` and return a handle to it
    pub fn spawn(backend: Arc<dyn AgentBackend>) -> Self {
        let (tx, mut rx) = mpsc::channel::<Command>(64);
        let name = backend.name();

        tokio::spawn(async move {
            while let Some(cmd) = rx.recv().await {
                match cmd {
                    Command::Prompt {
                        request,
                        event_tx,
                        reply,
                    } => {
                        let backend = Arc::clone(&backend);
                        tokio::spawn(async move {
                            run_prompt(backend.as_ref(), &request, event_tx, reply).await;
                        });
                    }
                    Command::Forget { session_id, reply } => {
                        let _ = reply.send(backend.forget(&session_id).await);
                    }
                }
            }
            tracing::debug!(backend = name, "Backend worker stopped");
        });

        Self::new(tx, name)
    }

    /// Get the backend name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Send a prompt and receive events via EventReceiver
    pub async fn prompt(&self, request: PromptRequest) -> Result<EventReceiver> {
        let (event_tx, event_rx) = mpsc::channel(256);
        let (reply_tx, reply_rx) = oneshot::channel();

        self.tx
            .send(Command::Prompt {
                request,
                event_tx,
                reply: reply_tx,
            })
            .await
            .map_err(|_| anyhow::anyhow!("Backend worker closed"))?;

        // Wait for the backend to acknowledge the prompt started
        reply_rx
            .await
            .map_err(|_| anyhow::anyhow!("Backend worker dropped reply channel"))??;

        Ok(EventReceiver::new(event_rx))
    }

    /// Drop the backend's memory for a session
    pub async fn forget(&self, session_id: &str) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Forget {
                session_id: session_id.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| anyhow::anyhow!("Backend worker closed"))?;
        reply_rx
            .await
            .map_err(|_| anyhow::anyhow!("Backend worker dropped reply channel"))?
    }
}

async fn run_prompt(
    backend: &dyn AgentBackend,
    request: &PromptRequest,
    event_tx: mpsc::Sender<AgentEvent>,
    reply: oneshot::Sender<Result<()>>,
) {
    match backend.prompt(request).await {
        Ok(mut stream) => {
            let _ = reply.send(Ok(()));
            while let Some(event) = stream.next().await {
                if event_tx.send(event).await.is_err() {
                    break;
                }
            }
        }
        Err(e) => {
            let _ = reply.send(Err(e));
        }
    }
}

/// Receiver for streaming events from a prompt.
///
/// This is `Send` so it can be passed across async task boundaries.
pub struct EventReceiver {
    rx: mpsc::Receiver<AgentEvent>,
}

/// Final text of a prompt plus the names of tools used along the way
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub tools_used: Vec<String>,
}

impl EventReceiver {
    /// Create a new EventReceiver wrapping the given channel
    pub fn new(rx: mpsc::Receiver<AgentEvent>) -> Self {
        Self { rx }
    }

    /// Receive the next event, or None if the stream is closed
    pub async fn recv(&mut self) -> Option<AgentEvent> {
        self.rx.recv().await
    }

    /// Drain the stream into its final result.
    ///
    /// Streamed `Text` chunks are used when the backend never sends a
    /// `Result`. An `Error` event or an empty stream becomes an error.
    pub async fn complete(mut self) -> Result<Completion> {
        let mut streamed = String::new();
        let mut tools_used = Vec::new();

        while let Some(event) = self.recv().await {
            match event {
                AgentEvent::Text(chunk) => streamed.push_str(&chunk),
                AgentEvent::ToolStart { name, .. } => tools_used.push(name),
                AgentEvent::ToolEnd {
                    name,
                    success: false,
                    ..
                } => {
                    tracing::debug!(tool = %name, "Tool reported failure");
                }
                AgentEvent::ToolEnd { .. } => {}
                AgentEvent::Result { text, usage } => {
                    if let Some(usage) = usage {
                        tracing::debug!(
                            input_tokens = usage.input_tokens,
                            output_tokens = usage.output_tokens,
                            "Prompt usage"
                        );
                    }
                    return Ok(Completion { text, tools_used });
                }
                AgentEvent::Error { code, message, .. } => {
                    anyhow::bail!("{}: {}", code, message);
                }
            }
        }

        if streamed.is_empty() {
            anyhow::bail!("{}: stream ended without a result", ErrorCode::MalformedResponse);
        }
        Ok(Completion {
            text: streamed,
            tools_used,
        })
    }
}

// ABOUTME: Core AgentBackend trait that all backends implement.
// ABOUTME: Defines prompt execution and per-session memory reset.

use crate::{AgentEvent, PromptRequest};
use anyhow::Result;
use futures::future::BoxFuture;
use futures::stream::BoxStream;

/// Core trait that all agent backends implement.
///
/// Methods return boxed futures so a handle can drive any backend from a
/// worker task without knowing its concrete type.
pub trait AgentBackend: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    /// Send a prompt and receive a stream of events
    ///
    /// The returned stream emits events as they occur (tool calls, text) and
    /// finishes with a Result or Error event.
    fn prompt<'a>(
        &'a self,
        request: &'a PromptRequest,
    ) -> BoxFuture<'a, Result<BoxStream<'a, AgentEvent>>>;

    /// Drop any memory the backend keeps for a session
    fn forget<'a>(&'a self, session_id: &'a str) -> BoxFuture<'a, Result<()>>;
}

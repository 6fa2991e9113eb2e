// ABOUTME: Mock backend for testing - returns pre-configured responses.
// ABOUTME: Records every request so tests can assert on what the router sent.
//!
//! # Example
//!
//! ```no_run
//! use aibot_agent::backends::mock::MockBackend;
//! use aibot_agent::{PromptRequest, Turn};
//!
//! # async fn example() {
//! let mock = MockBackend::new().on_prompt("hello").respond_text("Hi there!");
//!
//! let handle = mock.clone().into_handle();
//! let request = PromptRequest::new("!room:example.com", "gpt-3.5-turbo", vec![Turn::user("hello")]);
//! let reply = handle.prompt(request).await.unwrap().complete().await.unwrap();
//!
//! assert_eq!(reply.text, "Hi there!");
//! assert_eq!(mock.requests().len(), 1);
//! # }
//! ```

use crate::event::{AgentEvent, ErrorCode};
use crate::handle::AgentHandle;
use crate::{AgentBackend, PromptRequest};
use anyhow::Result;
use futures::future::BoxFuture;
use futures::stream::{self, BoxStream};
use futures::{FutureExt, StreamExt};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Mock backend for testing
#[derive(Clone, Default)]
pub struct MockBackend {
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
    requests: Arc<Mutex<Vec<PromptRequest>>>,
    forgotten: Arc<Mutex<Vec<String>>>,
}

struct Expectation {
    pattern: String,
    outcome: Outcome,
}

enum Outcome {
    Events(Vec<AgentEvent>),
    Reject(String),
}

impl MockBackend {
    /// Create a new mock backend with no expectations
    pub fn new() -> Self {
        Self::default()
    }

    /// Set up an expectation for a prompt whose input contains `pattern`
    pub fn on_prompt(self, pattern: &str) -> ExpectationBuilder {
        ExpectationBuilder {
            backend: self,
            pattern: pattern.to_string(),
        }
    }

    /// Every request received so far, in arrival order
    pub fn requests(&self) -> Vec<PromptRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Session ids passed to `forget`
    pub fn forgotten(&self) -> Vec<String> {
        self.forgotten
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Convert this backend into an AgentHandle
    pub fn into_handle(self) -> AgentHandle {
        AgentHandle::spawn(Arc::new(self))
    }

    /// Factory function for the registry
    pub fn factory() -> crate::registry::BackendFactory {
        Box::new(|_config| Ok(MockBackend::new().into_handle()))
    }

    /// Match expectations with FIFO preference: check the front first,
    /// fall back to searching the queue if the front doesn't match.
    fn take_outcome(&self, input: &str) -> Option<Outcome> {
        let mut exp = self.expectations.lock().unwrap_or_else(|e| e.into_inner());
        match exp.front() {
            Some(front) if input.contains(&front.pattern) => exp.pop_front().map(|e| e.outcome),
            Some(_) => exp
                .iter()
                .position(|e| input.contains(&e.pattern))
                .and_then(|i| exp.remove(i))
                .map(|e| e.outcome),
            None => None,
        }
    }
}

impl AgentBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn prompt<'a>(
        &'a self,
        request: &'a PromptRequest,
    ) -> BoxFuture<'a, Result<BoxStream<'a, AgentEvent>>> {
        async move {
            self.requests
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(request.clone());

            let events = match self.take_outcome(request.input()) {
                Some(Outcome::Events(events)) => events,
                Some(Outcome::Reject(message)) => anyhow::bail!(message),
                None => vec![AgentEvent::Result {
                    text: format!("Mock: no expectation for '{}'", request.input()),
                    usage: None,
                }],
            };

            Ok(stream::iter(events).boxed())
        }
        .boxed()
    }

    fn forget<'a>(&'a self, session_id: &'a str) -> BoxFuture<'a, Result<()>> {
        async move {
            self.forgotten
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(session_id.to_string());
            Ok(())
        }
        .boxed()
    }
}

/// Builder for setting up mock expectations with a fluent API
pub struct ExpectationBuilder {
    backend: MockBackend,
    pattern: String,
}

impl ExpectationBuilder {
    fn push(self, outcome: Outcome) -> MockBackend {
        self.backend
            .expectations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Expectation {
                pattern: self.pattern,
                outcome,
            });
        self.backend
    }

    /// Respond with a list of events
    pub fn respond_with(self, events: Vec<AgentEvent>) -> MockBackend {
        self.push(Outcome::Events(events))
    }

    /// Respond with a simple text result
    pub fn respond_text(self, text: &str) -> MockBackend {
        self.respond_with(vec![AgentEvent::Result {
            text: text.to_string(),
            usage: None,
        }])
    }

    /// Respond with an error event
    pub fn respond_error(self, code: ErrorCode, message: &str) -> MockBackend {
        self.respond_with(vec![AgentEvent::Error {
            code,
            message: message.to_string(),
            recoverable: false,
        }])
    }

    /// Fail the prompt before any event is produced
    pub fn reject(self, message: &str) -> MockBackend {
        self.push(Outcome::Reject(message.to_string()))
    }
}

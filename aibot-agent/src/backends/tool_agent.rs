// ABOUTME: Tool-augmented agent backend with per-session summarizing memory.
// ABOUTME: Runs a function-calling loop over search, calculator and wikipedia tools.

use crate::event::AgentEvent;
use crate::handle::AgentHandle;
use crate::memory::{summarization_prompt, SummaryBuffer, DEFAULT_MAX_TOKEN_LIMIT};
use crate::openai::{ChatResult, Message, MessageRole, OpenAiClient, Sampling};
use crate::tools::{ToolContext, ToolExecutor};
use crate::{AgentBackend, ApiError, PromptRequest, Turn, Usage};
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use futures::stream::{self, BoxStream};
use futures::{FutureExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const MAX_TOOL_ITERATIONS: usize = 5;

const AGENT_INSTRUCTIONS: &str = "You are a helpful assistant chatting in a group messaging room. \
Use the available tools when a question needs current information, arithmetic, or encyclopedic \
facts. Answer concisely.";

/// Factory config, deserialized from the backend section
#[derive(Debug, Clone, Deserialize)]
pub struct ToolAgentConfig {
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub serpapi_api_key: Option<String>,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_memory_token_limit")]
    pub memory_token_limit: usize,
    #[serde(default = "super::chat::default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

fn default_max_tokens() -> u32 {
    512
}

fn default_memory_token_limit() -> usize {
    DEFAULT_MAX_TOKEN_LIMIT
}

pub struct ToolAgentBackend {
    client: OpenAiClient,
    tools: ToolContext,
    sampling: Sampling,
    instructions: String,
    memory_token_limit: usize,
    memories: Mutex<HashMap<String, SummaryBuffer>>,
}

impl ToolAgentBackend {
    pub fn new(config: ToolAgentConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = OpenAiClient::new(config.api_key, config.base_url, timeout)?;
        let tools = ToolContext::new(config.serpapi_api_key, timeout)?;
        Ok(Self {
            client,
            tools,
            sampling: Sampling {
                max_tokens: config.max_tokens,
                temperature: config.temperature,
            },
            instructions: config
                .system_prompt
                .unwrap_or_else(|| AGENT_INSTRUCTIONS.to_string()),
            memory_token_limit: config.memory_token_limit,
            memories: Mutex::new(HashMap::new()),
        })
    }

    /// Factory function for the registry
    pub fn factory() -> crate::registry::BackendFactory {
        Box::new(|config| {
            let config: ToolAgentConfig = serde_json::from_value(config.clone())
                .context("Invalid agent backend config")?;
            let backend = ToolAgentBackend::new(config)?;
            Ok(AgentHandle::spawn(Arc::new(backend)))
        })
    }

    fn memory_snapshot(&self, session_id: &str) -> SummaryBuffer {
        self.memories
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(session_id)
            .cloned()
            .unwrap_or_else(|| SummaryBuffer::new(self.memory_token_limit))
    }

    fn store_memory(&self, session_id: &str, memory: SummaryBuffer) {
        self.memories
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(session_id.to_string(), memory);
    }

    /// Function-calling loop. Tool events are appended to `events`.
    async fn run(
        &self,
        model: &str,
        mut messages: Vec<Message>,
        events: &mut Vec<AgentEvent>,
    ) -> Result<(String, Option<Usage>), ApiError> {
        let definitions = self.tools.definitions();

        for _ in 0..MAX_TOOL_ITERATIONS {
            match self
                .client
                .chat(model, &messages, self.sampling, Some(definitions.as_slice()))
                .await?
            {
                ChatResult::TextResponse { text, usage } => return Ok((text, usage)),
                ChatResult::ToolCalls {
                    tool_calls,
                    assistant_message,
                } => {
                    messages.push(assistant_message);

                    for call in tool_calls {
                        let input = serde_json::from_str(&call.function.arguments)
                            .unwrap_or_else(|_| json!(call.function.arguments));
                        events.push(AgentEvent::ToolStart {
                            id: call.id.clone(),
                            name: call.function.name.clone(),
                            input,
                        });

                        let started = Instant::now();
                        let result = ToolExecutor::execute(
                            &call.function.name,
                            &call.function.arguments,
                            &self.tools,
                        )
                        .await;
                        let success = result.is_ok();
                        let output = result.unwrap_or_else(|e| {
                            tracing::warn!(tool = %call.function.name, error = %e, "Tool execution failed");
                            format!("Error: {}", e)
                        });

                        events.push(AgentEvent::ToolEnd {
                            id: call.id.clone(),
                            name: call.function.name.clone(),
                            output: json!(output),
                            success,
                            duration_ms: started.elapsed().as_millis() as u64,
                        });
                        messages.push(Message::tool_result(call.id, output));
                    }
                }
            }
        }

        Err(ApiError::ToolLoopLimit)
    }

    /// Fold overflowing turns into the running summary
    async fn summarize(&self, model: &str, memory: &mut SummaryBuffer) {
        let overflow = memory.take_overflow();
        if overflow.is_empty() {
            return;
        }

        let prompt = summarization_prompt(memory.summary(), &overflow);
        let sampling = Sampling {
            max_tokens: self.sampling.max_tokens,
            temperature: 0.0,
        };
        match self
            .client
            .chat(model, &[Message::new(MessageRole::User, prompt)], sampling, None)
            .await
        {
            Ok(ChatResult::TextResponse { text, .. }) => memory.set_summary(text),
            Ok(ChatResult::ToolCalls { .. }) => {
                tracing::warn!("Summarizer asked for tools; keeping previous summary");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to summarize memory; keeping previous summary");
            }
        }
    }
}

impl AgentBackend for ToolAgentBackend {
    fn name(&self) -> &'static str {
        "agent"
    }

    fn prompt<'a>(
        &'a self,
        request: &'a PromptRequest,
    ) -> BoxFuture<'a, Result<BoxStream<'a, AgentEvent>>> {
        async move {
            let input = request.input().trim().to_string();
            let mut memory = self.memory_snapshot(&request.session_id);

            let mut messages = vec![Message::new(MessageRole::System, self.instructions.clone())];
            messages.extend(memory.context().iter().map(Message::from));
            messages.push(Message::new(MessageRole::User, input.clone()));

            let mut events = Vec::new();
            match self.run(&request.model, messages, &mut events).await {
                Ok((text, usage)) => {
                    memory.push(Turn::user(input));
                    memory.push(Turn::assistant(text.trim()));
                    self.summarize(&request.model, &mut memory).await;
                    self.store_memory(&request.session_id, memory);
                    events.push(AgentEvent::Result { text, usage });
                }
                Err(e) => {
                    events.push(AgentEvent::Error {
                        code: e.code(),
                        recoverable: e.recoverable(),
                        message: e.to_string(),
                    });
                }
            }

            Ok(stream::iter(events).boxed())
        }
        .boxed()
    }

    fn forget<'a>(&'a self, session_id: &'a str) -> BoxFuture<'a, Result<()>> {
        async move {
            self.memories
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(session_id);
            Ok(())
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> ToolAgentBackend {
        let config: ToolAgentConfig =
            serde_json::from_value(json!({"api_key": "sk-test"})).unwrap();
        ToolAgentBackend::new(config).unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let config: ToolAgentConfig =
            serde_json::from_value(json!({"api_key": "sk-test"})).unwrap();
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.memory_token_limit, 200);
        assert!(config.serpapi_api_key.is_none());
    }

    #[test]
    fn test_memory_snapshot_starts_empty() {
        let backend = backend();
        let memory = backend.memory_snapshot("!room:test");
        assert!(memory.buffer().is_empty());
        assert!(memory.summary().is_empty());
    }

    #[tokio::test]
    async fn test_forget_drops_session_memory() {
        let backend = backend();
        let mut memory = SummaryBuffer::new(200);
        memory.push(Turn::user("remember me"));
        backend.store_memory("!room:test", memory);
        assert_eq!(backend.memory_snapshot("!room:test").buffer().len(), 1);

        backend.forget("!room:test").await.unwrap();
        assert!(backend.memory_snapshot("!room:test").buffer().is_empty());
    }
}

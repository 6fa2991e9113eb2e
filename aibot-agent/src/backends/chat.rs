// ABOUTME: Direct chat-completion backend: one stateless API call per prompt.
// ABOUTME: Sends the full turn sequence with fixed sampling parameters.

use crate::event::AgentEvent;
use crate::handle::AgentHandle;
use crate::openai::{ChatResult, Message, OpenAiClient, Sampling};
use crate::{AgentBackend, ErrorCode, PromptRequest};
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use futures::stream::{self, BoxStream};
use futures::{FutureExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_MAX_TOKENS: u32 = 200;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Factory config, deserialized from the backend section
#[derive(Debug, Clone, Deserialize)]
pub struct ChatBackendConfig {
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

pub(crate) fn default_timeout_secs() -> u64 {
    120
}

pub struct ChatCompletionBackend {
    client: OpenAiClient,
    sampling: Sampling,
}

impl ChatCompletionBackend {
    pub fn new(config: ChatBackendConfig) -> Result<Self> {
        let client = OpenAiClient::new(
            config.api_key,
            config.base_url,
            Duration::from_secs(config.timeout_secs),
        )?;
        Ok(Self {
            client,
            sampling: Sampling {
                max_tokens: config.max_tokens,
                temperature: config.temperature,
            },
        })
    }

    /// Factory function for the registry
    pub fn factory() -> crate::registry::BackendFactory {
        Box::new(|config| {
            let config: ChatBackendConfig = serde_json::from_value(config.clone())
                .context("Invalid chat backend config")?;
            let backend = ChatCompletionBackend::new(config)?;
            Ok(AgentHandle::spawn(Arc::new(backend)))
        })
    }
}

impl AgentBackend for ChatCompletionBackend {
    fn name(&self) -> &'static str {
        "chat"
    }

    fn prompt<'a>(
        &'a self,
        request: &'a PromptRequest,
    ) -> BoxFuture<'a, Result<BoxStream<'a, AgentEvent>>> {
        async move {
            let messages: Vec<Message> = request.turns.iter().map(Message::from).collect();

            let event = match self
                .client
                .chat(&request.model, &messages, self.sampling, None)
                .await
            {
                Ok(ChatResult::TextResponse { text, usage }) => AgentEvent::Result { text, usage },
                Ok(ChatResult::ToolCalls { .. }) => AgentEvent::Error {
                    code: ErrorCode::MalformedResponse,
                    message: "Model requested tools but none were offered".to_string(),
                    recoverable: false,
                },
                Err(e) => AgentEvent::Error {
                    code: e.code(),
                    recoverable: e.recoverable(),
                    message: e.to_string(),
                },
            };

            Ok(stream::once(async move { event }).boxed())
        }
        .boxed()
    }

    fn forget<'a>(&'a self, _session_id: &'a str) -> BoxFuture<'a, Result<()>> {
        // Stateless: the router owns the turns
        async { Ok(()) }.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_defaults() {
        let config: ChatBackendConfig =
            serde_json::from_value(json!({"api_key": "sk-test"})).unwrap();
        assert_eq!(config.max_tokens, 200);
        assert_eq!(config.temperature, DEFAULT_TEMPERATURE);
        assert!(config.base_url.is_none());
    }

    #[test]
    fn test_config_requires_api_key() {
        let result: std::result::Result<ChatBackendConfig, _> =
            serde_json::from_value(json!({"temperature": 0.2}));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_factory_builds_handle() {
        let factory = ChatCompletionBackend::factory();
        let handle = factory(&json!({"api_key": "sk-test"})).unwrap();
        assert_eq!(handle.name(), "chat");
    }
}

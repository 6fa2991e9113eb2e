// ABOUTME: Minimal client for OpenAI-compatible chat/completions endpoints.
// ABOUTME: Shared by the direct chat backend and the tool-calling agent backend.

use crate::error::ApiError;
use crate::{Role, Turn, Usage};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Sampling parameters sent with every completion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    n: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolDefinition]>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl From<Role> for MessageRole {
    fn from(role: Role) -> Self {
        match role {
            Role::System => MessageRole::System,
            Role::User => MessageRole::User,
            Role::Assistant => MessageRole::Assistant,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

impl From<&Turn> for Message {
    fn from(turn: &Turn) -> Self {
        Message::new(turn.role.into(), turn.content.clone())
    }
}

// Tool calling structures
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

/// Result of a chat completion
#[derive(Debug)]
pub enum ChatResult {
    /// Model produced a text response
    TextResponse { text: String, usage: Option<Usage> },
    /// Model wants to call tools
    ToolCalls {
        tool_calls: Vec<ToolCall>,
        assistant_message: Message,
    },
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(api_key: String, base_url: Option<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        Ok(Self {
            api_key,
            base_url,
            client,
        })
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    pub async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        sampling: Sampling,
        tools: Option<&[ToolDefinition]>,
    ) -> Result<ChatResult, ApiError> {
        tracing::debug!(
            model = %model,
            messages = messages.len(),
            "Sending chat completion request"
        );

        let request = ChatCompletionRequest {
            model,
            messages,
            max_tokens: sampling.max_tokens,
            n: 1,
            temperature: sampling.temperature,
            tools,
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .text()
                .await
                .unwrap_or_else(|e| format!("Failed to read error response: {}", e));
            return Err(ApiError::Status { status, message });
        }

        let api_response: ChatCompletionResponse = response.json().await?;
        parse_response(api_response)
    }
}

fn parse_response(api_response: ChatCompletionResponse) -> Result<ChatResult, ApiError> {
    let usage = api_response.usage.map(|u| Usage {
        input_tokens: u.prompt_tokens,
        output_tokens: u.completion_tokens,
    });

    let message = api_response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::Response("No choices in response".to_string()))?
        .message;

    if let Some(tool_calls) = message.tool_calls.clone().filter(|c| !c.is_empty()) {
        tracing::debug!(count = tool_calls.len(), "Model requested tool calls");
        return Ok(ChatResult::ToolCalls {
            tool_calls,
            assistant_message: message,
        });
    }

    let text = message
        .content
        .ok_or_else(|| ApiError::Response("Response message has no content".to_string()))?;
    Ok(ChatResult::TextResponse { text, usage })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_body_shape() {
        let messages = vec![
            Message::from(&Turn::system("You are helpful")),
            Message::from(&Turn::user("hello")),
        ];
        let request = ChatCompletionRequest {
            model: "gpt-3.5-turbo",
            messages: &messages,
            max_tokens: 200,
            n: 1,
            temperature: 0.5,
            tools: None,
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "gpt-3.5-turbo",
                "messages": [
                    {"role": "system", "content": "You are helpful"},
                    {"role": "user", "content": "hello"}
                ],
                "max_tokens": 200,
                "n": 1,
                "temperature": 0.5
            })
        );
    }

    #[test]
    fn test_parse_text_response() {
        let raw: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": "  Hi!  "}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3}
        }))
        .unwrap();
        match parse_response(raw).unwrap() {
            ChatResult::TextResponse { text, usage } => {
                assert_eq!(text, "  Hi!  ");
                assert_eq!(usage.unwrap().input_tokens, 12);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_parse_tool_call_response() {
        let raw: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{"message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "calculator", "arguments": "{\"expression\":\"2+2\"}"}
                }]
            }}]
        }))
        .unwrap();
        match parse_response(raw).unwrap() {
            ChatResult::ToolCalls { tool_calls, .. } => {
                assert_eq!(tool_calls.len(), 1);
                assert_eq!(tool_calls[0].function.name, "calculator");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_parse_empty_choices_is_error() {
        let raw: ChatCompletionResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        let err = parse_response(raw).unwrap_err();
        assert!(matches!(err, ApiError::Response(_)));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = OpenAiClient::new(
            "key".to_string(),
            Some("http://localhost:8080/v1/".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.completions_url(), "http://localhost:8080/v1/chat/completions");
    }
}

// ABOUTME: Conversation turn and prompt request types shared by all backends.
// ABOUTME: Turns serialize to the chat-completion wire shape ({role, content}).

use serde::{Deserialize, Serialize};

/// Who produced a turn
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A single prompt sent to a backend
#[derive(Debug, Clone, PartialEq)]
pub struct PromptRequest {
    /// Session the prompt belongs to (the room id)
    pub session_id: String,
    /// Provider model name to use for this prompt
    pub model: String,
    /// Full conversation, ending with the new user turn
    pub turns: Vec<Turn>,
}

impl PromptRequest {
    pub fn new(session_id: impl Into<String>, model: impl Into<String>, turns: Vec<Turn>) -> Self {
        Self {
            session_id: session_id.into(),
            model: model.into(),
            turns,
        }
    }

    /// Text of the newest user turn, or "" if there is none
    pub fn input(&self) -> &str {
        self.turns
            .iter()
            .rev()
            .find(|t| t.role == Role::User)
            .map(|t| t.content.as_str())
            .unwrap_or("")
    }
}

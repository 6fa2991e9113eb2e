// ABOUTME: Backend implementations (direct chat completion, tool agent, mock).
// ABOUTME: Each backend implements the AgentBackend trait.

pub mod chat;
pub mod mock;
pub mod tool_agent;

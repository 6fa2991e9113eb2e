// ABOUTME: Root library module for the Matrix side of aibot
// ABOUTME: Client setup, the Matrix chat interface, homeserver calls and event conversion

pub mod homeserver;
pub mod matrix_client;
pub mod matrix_interface;
pub mod message_handler;

// Re-export platform-agnostic modules from aibot-core
pub use aibot_core::{config, router, traits};

// Re-export aibot-agent types for convenience
pub use aibot_agent::{AgentEvent, AgentHandle, AgentRegistry};

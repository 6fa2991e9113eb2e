// ABOUTME: Platform-agnostic conversation routing for the aibot chat bridge
// ABOUTME: Provides host traits, addressing policies and the conversation router

pub mod addressing;
pub mod commands;
pub mod config;
pub mod conversation;
pub mod html;
pub mod router;
pub mod traits;
pub mod welcome;

pub use addressing::{Addressing, AddressingStrategy};
pub use config::Config;
pub use conversation::{ConversationStore, ModelVersion};
pub use router::Router;

// Re-export core traits for convenient access
pub use traits::{
    AccountDataStore, ChatInterface, ChatRoom, ChatUser, IncomingMessage, Membership,
    MembershipEvent, MessageContent,
};

// Re-export aibot-agent types
pub use aibot_agent::{AgentEvent, AgentHandle, AgentRegistry};

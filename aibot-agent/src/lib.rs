// ABOUTME: Pluggable language-model backend abstraction for aibot.
// ABOUTME: Provides trait-based backends (chat completion, tool agent, mock) behind Send+Sync handles.

pub mod error;
pub mod event;
pub mod handle;
pub mod openai;
pub mod registry;
pub mod request;
pub mod traits;

pub mod backends;
pub mod memory;
pub mod tools;

pub use error::ApiError;
pub use event::{AgentEvent, ErrorCode, Usage};
pub use handle::{AgentHandle, Completion, EventReceiver};
pub use registry::{AgentRegistry, BackendFactory};
pub use request::{PromptRequest, Role, Turn};
pub use traits::AgentBackend;

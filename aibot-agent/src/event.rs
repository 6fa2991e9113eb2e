// ABOUTME: Event types emitted by agent backends during prompt execution.
// ABOUTME: Covers streamed text, tool lifecycle, final results and typed errors.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Events emitted by agent backends during prompt execution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum AgentEvent {
    /// Streaming text chunk
    Text(String),

    /// Tool started execution
    ToolStart {
        /// Unique identifier for this tool invocation
        id: String,
        /// Tool name (e.g., "search", "calculator", "wikipedia")
        name: String,
        /// Arguments passed to the tool
        input: Value,
    },

    /// Tool completed execution
    ToolEnd {
        /// Matches the id from ToolStart
        id: String,
        /// Tool name
        name: String,
        /// Output handed back to the model
        output: Value,
        /// Whether the tool succeeded
        success: bool,
        /// Execution time in milliseconds
        duration_ms: u64,
    },

    /// Final result with optional usage statistics
    Result {
        /// The final text response
        text: String,
        /// Token usage (if the provider reports it)
        usage: Option<Usage>,
    },

    /// Error occurred during execution
    Error {
        /// Typed error code for programmatic handling
        code: ErrorCode,
        /// Human-readable error message
        message: String,
        /// Whether the error is recoverable (can retry)
        recoverable: bool,
    },
}

/// Typed error codes for programmatic handling
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCode {
    /// Request timed out
    Timeout,
    /// Rate limited or out of quota
    RateLimited,
    /// Authentication failed
    AuthFailed,
    /// Tool execution failed
    ToolFailed,
    /// Provider returned something we could not use
    MalformedResponse,
    /// Backend-specific error
    BackendError,
    /// Unknown error
    Unknown,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Timeout => "timeout",
            ErrorCode::RateLimited => "rate_limited",
            ErrorCode::AuthFailed => "auth_failed",
            ErrorCode::ToolFailed => "tool_failed",
            ErrorCode::MalformedResponse => "malformed_response",
            ErrorCode::BackendError => "backend_error",
            ErrorCode::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token usage reported by the provider
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Usage {
    /// Prompt tokens consumed
    pub input_tokens: u64,
    /// Completion tokens generated
    pub output_tokens: u64,
}

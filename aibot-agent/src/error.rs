// ABOUTME: Typed errors for the chat-completion HTTP layer.
// ABOUTME: Maps transport and provider failures onto ErrorCode for event reporting.

use crate::ErrorCode;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("LLM API error ({status}): {message}")]
    Status { status: StatusCode, message: String },

    #[error("LLM response error: {0}")]
    Response(String),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Tool loop limit exceeded")]
    ToolLoopLimit,
}

impl ApiError {
    /// Classify the error for AgentEvent::Error
    pub fn code(&self) -> ErrorCode {
        match self {
            ApiError::Status { status, .. } => match *status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ErrorCode::AuthFailed,
                StatusCode::TOO_MANY_REQUESTS => ErrorCode::RateLimited,
                StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ErrorCode::Timeout,
                _ => ErrorCode::BackendError,
            },
            ApiError::Response(_) => ErrorCode::MalformedResponse,
            ApiError::Reqwest(e) if e.is_timeout() => ErrorCode::Timeout,
            ApiError::Reqwest(e) if e.is_decode() => ErrorCode::MalformedResponse,
            ApiError::Reqwest(_) => ErrorCode::BackendError,
            ApiError::ToolLoopLimit => ErrorCode::ToolFailed,
        }
    }

    /// Whether retrying the same request later could succeed
    pub fn recoverable(&self) -> bool {
        matches!(
            self.code(),
            ErrorCode::Timeout | ErrorCode::RateLimited | ErrorCode::BackendError
        )
    }
}

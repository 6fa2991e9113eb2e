// ABOUTME: Host traits the router talks through: rooms, the chat interface, account data.
// ABOUTME: The Matrix adapter implements these; tests use in-memory mocks.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Debug;
use std::time::Duration;

// =============================================================================
// Message Content Types
// =============================================================================

/// Content that can be sent to a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    /// Plain text message
    Plain(String),
    /// Message with both plain text and HTML formatting
    Html { plain: String, html: String },
}

impl MessageContent {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain(text.into())
    }

    pub fn html(plain: impl Into<String>, html: impl Into<String>) -> Self {
        Self::Html {
            plain: plain.into(),
            html: html.into(),
        }
    }

    /// The plain-text body
    pub fn body(&self) -> &str {
        match self {
            MessageContent::Plain(text) => text,
            MessageContent::Html { plain, .. } => plain,
        }
    }
}

// =============================================================================
// User Identity
// =============================================================================

/// Identity of a chat user
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChatUser {
    /// Unique identifier (e.g., @user:matrix.org)
    pub id: String,
    /// Display name
    pub display_name: Option<String>,
}

impl ChatUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
        }
    }

    pub fn with_name(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: Some(name.into()),
        }
    }
}

// =============================================================================
// Incoming Events
// =============================================================================

/// A text message delivered to a room
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// The room this message was sent in
    pub room_id: String,
    /// The user who sent the message
    pub sender: ChatUser,
    /// Platform-specific event ID
    pub event_id: String,
    /// Plain body
    pub body: String,
    /// HTML body, when the message is formatted
    pub formatted_body: Option<String>,
    /// Event this message replies to, if any
    pub in_reply_to: Option<String>,
}

impl IncomingMessage {
    pub fn new(
        room_id: impl Into<String>,
        sender: impl Into<String>,
        event_id: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            room_id: room_id.into(),
            sender: ChatUser::new(sender),
            event_id: event_id.into(),
            body: body.into(),
            formatted_body: None,
            in_reply_to: None,
        }
    }

    pub fn with_formatted_body(mut self, html: impl Into<String>) -> Self {
        self.formatted_body = Some(html.into());
        self
    }

    pub fn replying_to(mut self, event_id: impl Into<String>) -> Self {
        self.in_reply_to = Some(event_id.into());
        self
    }
}

/// Room membership state of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    Join,
    Invite,
    Leave,
    Ban,
    Knock,
}

/// A membership change in a room
#[derive(Debug, Clone)]
pub struct MembershipEvent {
    pub room_id: String,
    /// The user whose membership changed
    pub target: String,
    pub membership: Membership,
}

// =============================================================================
// Host Capabilities
// =============================================================================

/// A room on the chat host
#[async_trait]
pub trait ChatRoom: Send + Sync + Debug + Clone {
    /// Unique identifier for this room
    fn id(&self) -> &str;

    /// Currently joined members, fetched fresh on every call
    async fn members(&self) -> Result<Vec<ChatUser>>;

    /// Send a message to this room
    async fn send(&self, content: MessageContent) -> Result<()>;

    /// Send a message as a reply to `event_id`
    async fn reply(&self, event_id: &str, content: MessageContent) -> Result<()>;

    /// Set the bot's typing state. `timeout` only applies when typing.
    async fn set_typing(&self, typing: bool, timeout: Duration) -> Result<()>;

    /// Sender of an earlier event in this room
    async fn event_sender(&self, event_id: &str) -> Result<String>;
}

/// Per-room key/value storage kept by the host for the bot's account
#[async_trait]
pub trait AccountDataStore: Send + Sync {
    /// Read an entry; `Ok(None)` when it was never written
    async fn get_room_data(&self, room_id: &str, key: &str) -> Result<Option<Value>>;

    /// Write an entry, replacing any previous value
    async fn set_room_data(&self, room_id: &str, key: &str, value: Value) -> Result<()>;
}

/// The chat host as seen by the router
#[async_trait]
pub trait ChatInterface: Send + Sync {
    type Room: ChatRoom;

    async fn get_room(&self, room_id: &str) -> Option<Self::Room>;

    fn bot_user_id(&self) -> &str;

    fn is_self(&self, user_id: &str) -> bool {
        user_id == self.bot_user_id()
    }

    fn account_data(&self) -> &dyn AccountDataStore;
}

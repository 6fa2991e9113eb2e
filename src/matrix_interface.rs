// ABOUTME: Matrix SDK implementation of the aibot-core chat interface traits
// ABOUTME: Wraps matrix_sdk::Room and Client; typing, account data and event lookup go through Homeserver

use crate::homeserver::Homeserver;
use aibot_core::traits::{AccountDataStore, ChatInterface, ChatRoom, ChatUser, MessageContent};
use anyhow::{Context, Result};
use async_trait::async_trait;
use matrix_sdk::{
    room::Room,
    ruma::{
        events::{
            relation::InReplyTo,
            room::message::{Relation, RoomMessageEventContent},
        },
        EventId, RoomId,
    },
    Client, RoomMemberships,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Matrix-specific implementation of ChatRoom
#[derive(Clone)]
pub struct MatrixRoom {
    room: Room,
    homeserver: Arc<Homeserver>,
}

impl MatrixRoom {
    pub fn new(room: Room, homeserver: Arc<Homeserver>) -> Self {
        Self { room, homeserver }
    }

    /// Get the underlying Matrix room
    pub fn inner(&self) -> &Room {
        &self.room
    }
}

impl fmt::Debug for MatrixRoom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatrixRoom")
            .field("room_id", &self.room.room_id().as_str())
            .finish()
    }
}

fn event_content(content: MessageContent) -> RoomMessageEventContent {
    match content {
        MessageContent::Plain(text) => RoomMessageEventContent::text_plain(text),
        MessageContent::Html { plain, html } => RoomMessageEventContent::text_html(plain, html),
    }
}

#[async_trait]
impl ChatRoom for MatrixRoom {
    fn id(&self) -> &str {
        self.room.room_id().as_str()
    }

    async fn members(&self) -> Result<Vec<ChatUser>> {
        let members = self
            .room
            .members(RoomMemberships::JOIN)
            .await
            .context("Failed to fetch joined members")?;
        Ok(members
            .iter()
            .map(|m| ChatUser {
                id: m.user_id().to_string(),
                display_name: m.display_name().map(str::to_string),
            })
            .collect())
    }

    async fn send(&self, content: MessageContent) -> Result<()> {
        self.room
            .send(event_content(content))
            .await
            .context("Failed to send message")?;
        Ok(())
    }

    async fn reply(&self, event_id: &str, content: MessageContent) -> Result<()> {
        let event_id = EventId::parse(event_id)
            .with_context(|| format!("Invalid event ID: {}", event_id))?;
        let mut content = event_content(content);
        content.relates_to = Some(Relation::Reply {
            in_reply_to: InReplyTo::new(event_id),
        });
        self.room
            .send(content)
            .await
            .context("Failed to send reply")?;
        Ok(())
    }

    async fn set_typing(&self, typing: bool, timeout: Duration) -> Result<()> {
        self.homeserver
            .set_typing(self.id(), typing, timeout)
            .await
    }

    async fn event_sender(&self, event_id: &str) -> Result<String> {
        self.homeserver.event_sender(self.id(), event_id).await
    }
}

/// Matrix-specific implementation of ChatInterface
pub struct MatrixInterface {
    client: Client,
    homeserver: Arc<Homeserver>,
    /// Cached user ID - stored at construction to avoid Option handling on every call
    user_id: String,
}

impl MatrixInterface {
    /// Create a new MatrixInterface. Fails unless the client is logged in.
    pub fn new(client: Client) -> Result<Self> {
        let homeserver = Homeserver::from_client(&client)?;
        let user_id = homeserver.user_id().to_string();
        Ok(Self {
            client,
            homeserver: Arc::new(homeserver),
            user_id,
        })
    }

    /// Get the underlying Matrix client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Wrap an SDK room handed to an event handler
    pub fn wrap(&self, room: Room) -> MatrixRoom {
        MatrixRoom::new(room, Arc::clone(&self.homeserver))
    }
}

#[async_trait]
impl ChatInterface for MatrixInterface {
    type Room = MatrixRoom;

    async fn get_room(&self, room_id: &str) -> Option<Self::Room> {
        let room_id = RoomId::parse(room_id).ok()?;
        let room = self.client.get_room(&room_id)?;
        Some(self.wrap(room))
    }

    fn bot_user_id(&self) -> &str {
        &self.user_id
    }

    fn account_data(&self) -> &dyn AccountDataStore {
        self.homeserver.as_ref()
    }
}

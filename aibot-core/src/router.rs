// ABOUTME: Conversation router: decides when to answer, talks to the backend, keeps room state.
// ABOUTME: Also handles model switching, conversation clearing and the one-time join welcome.

use crate::addressing::{Addressing, AddressingStrategy};
use crate::commands::{parse_message, requests_clear, Command, ParseResult};
use crate::config::{BotConfig, ModelsConfig};
use crate::conversation::{ConversationStore, ModelVersion};
use crate::html::markdown_to_html;
use crate::traits::{
    ChatInterface, ChatRoom, ChatUser, IncomingMessage, Membership, MembershipEvent,
    MessageContent,
};
use crate::welcome;
use aibot_agent::{AgentHandle, PromptRequest, Role, Turn};
use anyhow::{anyhow, Context, Result};
use std::time::Duration;

/// Stored turns to send with a prompt. With a cap, only the newest `cap`
/// turns go out, after the room's leading system turn if it has one.
fn history_window(turns: &[Turn], cap: Option<usize>) -> Vec<Turn> {
    let Some(cap) = cap else {
        return turns.to_vec();
    };
    let (system, rest) = match turns.split_first() {
        Some((first, rest)) if first.role == Role::System => (Some(first), rest),
        _ => (None, turns),
    };
    let recent = &rest[rest.len().saturating_sub(cap)..];
    system.into_iter().chain(recent).cloned().collect()
}

pub const ERROR_REPLY: &str =
    "An error occurred while processing your request. Please check the logs for more information.";

pub const CLEARED_REPLY: &str = "Conversation cleared.";

/// Rooms where every message is for the bot: one other person, optionally
/// plus a bridge/automation account
pub fn is_direct_room(members: &[ChatUser], automation_suffix: &str) -> bool {
    match members.len() {
        2 => true,
        3 => members.iter().any(|m| m.id.ends_with(automation_suffix)),
        _ => false,
    }
}

pub struct Router {
    bot: BotConfig,
    models: ModelsConfig,
    addressing: Addressing,
    backend: AgentHandle,
    conversations: ConversationStore,
    join_lock: tokio::sync::Mutex<()>,
}

impl Router {
    pub fn new(bot: BotConfig, models: ModelsConfig, backend: AgentHandle) -> Result<Self> {
        let addressing = Addressing::new(bot.addressing)?;
        Ok(Self {
            bot,
            models,
            addressing,
            backend,
            conversations: ConversationStore::new(),
            join_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    pub fn is_direct_room(&self, members: &[ChatUser]) -> bool {
        is_direct_room(members, &self.bot.automation_suffix)
    }

    /// Reply to everything in direct rooms, otherwise only when addressed
    pub async fn should_reply<R: ChatRoom>(
        &self,
        room: &R,
        bot_user_id: &str,
        members: &[ChatUser],
        msg: &IncomingMessage,
    ) -> bool {
        self.is_direct_room(members)
            || self
                .extract_addressed_text(room, bot_user_id, msg)
                .await
                .is_some()
    }

    /// The part of a message meant for the bot, if the message addresses it.
    ///
    /// With prefix addressing, a reply to one of the bot's own messages
    /// counts as addressed; the whole body is returned.
    pub async fn extract_addressed_text<R: ChatRoom>(
        &self,
        room: &R,
        bot_user_id: &str,
        msg: &IncomingMessage,
    ) -> Option<String> {
        if let Some(text) =
            self.addressing
                .extract(&msg.body, msg.formatted_body.as_deref(), bot_user_id)
        {
            return Some(text);
        }

        if self.addressing.strategy() != AddressingStrategy::Prefix {
            return None;
        }

        let parent = msg.in_reply_to.as_deref()?;
        match room.event_sender(parent).await {
            Ok(sender) if sender == bot_user_id => Some(msg.body.trim().to_string()),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(
                    room_id = %room.id(),
                    event_id = %parent,
                    error = %e,
                    "Failed to resolve replied-to event"
                );
                None
            }
        }
    }

    async fn set_typing<R: ChatRoom>(&self, room: &R, typing: bool) {
        if !self.bot.typing_indicator {
            return;
        }
        let timeout = if typing {
            Duration::from_millis(self.bot.typing_timeout_ms)
        } else {
            Duration::ZERO
        };
        if let Err(e) = room.set_typing(typing, timeout).await {
            tracing::warn!(room_id = %room.id(), typing, error = %e, "Failed to set typing indicator");
        }
    }

    /// Run one exchange with the backend for `room` and return the reply text.
    ///
    /// Never fails: over-long input and backend errors become user-facing
    /// notices, and the room's turns only change on success.
    pub async fn converse<R: ChatRoom>(&self, room: &R, text: &str) -> String {
        let limit = self.bot.max_input_length;
        if text.chars().count() > limit {
            tracing::info!(room_id = %room.id(), limit, "Rejected over-long input");
            return format!(
                "Input text exceeds maximum length of {} characters.",
                limit
            );
        }

        let room_id = room.id();
        let text = text.trim();
        let room_turns = self.conversations.room(room_id);
        let mut turns = room_turns.lock().await;

        let seed = if turns.is_empty() {
            self.bot.system_prompt.as_deref().map(Turn::system)
        } else {
            None
        };
        let version = self.conversations.model_version(room_id);
        let model = self.models.get(version);

        let mut prompt_turns = Vec::with_capacity(turns.len() + 2);
        prompt_turns.extend(seed.iter().cloned());
        prompt_turns.extend(history_window(&turns, self.bot.max_history_turns));
        prompt_turns.push(Turn::user(text));
        let request = PromptRequest::new(room_id, &model.name, prompt_turns);

        tracing::debug!(
            room_id = %room_id,
            backend = self.backend.name(),
            model = %model.name,
            history = turns.len(),
            "Sending prompt"
        );

        self.set_typing(room, true).await;
        let result = self.prompt_backend(request).await;
        self.set_typing(room, false).await;

        match result {
            Ok((reply, tools_used)) => {
                if let Some(seed) = seed {
                    turns.push(seed);
                }
                turns.push(Turn::user(text));
                turns.push(Turn::assistant(reply.clone()));
                tracing::info!(
                    room_id = %room_id,
                    model = %model.name,
                    tools = ?tools_used,
                    reply_len = reply.len(),
                    "Backend replied"
                );
                reply
            }
            Err(e) => {
                tracing::error!(
                    room_id = %room_id,
                    backend = self.backend.name(),
                    model = %model.name,
                    error = %e,
                    "Backend call failed"
                );
                ERROR_REPLY.to_string()
            }
        }
    }

    async fn prompt_backend(&self, request: PromptRequest) -> Result<(String, Vec<String>)> {
        let completion = self.backend.prompt(request).await?.complete().await?;
        let reply = completion.text.trim().to_string();
        if reply.is_empty() {
            return Err(anyhow!("Backend returned an empty reply"));
        }
        Ok((reply, completion.tools_used))
    }

    /// Point the room at another model version
    pub fn switch_model_version(&self, room_id: &str, target: ModelVersion) -> String {
        let label = &self.models.get(target).label;
        let previous = self.conversations.set_model_version(room_id, target);
        if previous == target {
            return format!("This room is already using {}.", label);
        }

        tracing::info!(room_id = %room_id, model = ?target, "Switched model version");
        format!(
            "This room has been switched to {}. If you would like to undo this, type !{}",
            label,
            target.other().command()
        )
    }

    /// Forget the room's conversation; the model selection stays
    pub async fn clear_conversation(&self, room_id: &str) -> String {
        self.conversations.clear(room_id).await;
        if let Err(e) = self.backend.forget(room_id).await {
            tracing::warn!(room_id = %room_id, error = %e, "Backend failed to forget session");
        }
        tracing::info!(room_id = %room_id, "Conversation cleared");
        CLEARED_REPLY.to_string()
    }

    /// Send the welcome notice the first time the bot joins a room
    pub async fn handle_room_join<I: ChatInterface>(
        &self,
        chat: &I,
        event: &MembershipEvent,
    ) -> Result<()> {
        if event.membership != Membership::Join || !chat.is_self(&event.target) {
            return Ok(());
        }

        let _guard = self.join_lock.lock().await;
        let room_id = event.room_id.as_str();
        let key = self.bot.join_marker_key.as_str();
        let store = chat.account_data();

        let existing = match store.get_room_data(room_id, key).await {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(
                    room_id = %room_id,
                    error = %e,
                    "Failed to read join marker, treating as absent"
                );
                None
            }
        };
        if welcome::is_marker_set(existing.as_ref()) {
            tracing::debug!(room_id = %room_id, "Welcome already sent");
            return Ok(());
        }

        store
            .set_room_data(room_id, key, welcome::marker_value())
            .await
            .context("Failed to persist join marker")?;

        let room = chat
            .get_room(room_id)
            .await
            .ok_or_else(|| anyhow!("Joined room {} is not known to the client", room_id))?;
        let members = room.members().await.context("Failed to fetch room members")?;
        let html = if self.is_direct_room(&members) {
            &self.bot.welcome_direct
        } else {
            &self.bot.welcome_group
        };

        room.send(welcome::notice(html))
            .await
            .context("Failed to send welcome notice")?;
        tracing::info!(room_id = %room_id, members = members.len(), "Sent welcome notice");
        Ok(())
    }

    /// Full handling of one room message: commands, addressing, the exchange
    /// and the reply
    pub async fn handle_message<I: ChatInterface>(
        &self,
        chat: &I,
        room: &I::Room,
        msg: &IncomingMessage,
    ) -> Result<()> {
        if chat.is_self(&msg.sender.id) {
            return Ok(());
        }

        let body = match parse_message(&msg.body) {
            ParseResult::Ignore => return Ok(()),
            ParseResult::Command(Command::UseModel(version)) => {
                let reply = self.switch_model_version(room.id(), version);
                return self.send_reply(room, msg, &reply).await;
            }
            ParseResult::Command(Command::Clear) => {
                let reply = self.clear_conversation(room.id()).await;
                return self.send_reply(room, msg, &reply).await;
            }
            ParseResult::Command(Command::Unknown(name)) => {
                tracing::debug!(room_id = %room.id(), command = %name, "Ignoring unknown command");
                return Ok(());
            }
            ParseResult::Message(text) => text,
        };
        let message = IncomingMessage {
            body,
            ..msg.clone()
        };

        let members = room.members().await.context("Failed to fetch room members")?;
        let addressed = self
            .extract_addressed_text(room, chat.bot_user_id(), &message)
            .await;
        if addressed.is_none() && !self.is_direct_room(&members) {
            tracing::trace!(room_id = %room.id(), "Message not addressed to the bot");
            return Ok(());
        }

        let text = addressed
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| message.body.trim().to_string());

        let reply = if requests_clear(&text) {
            self.clear_conversation(room.id()).await
        } else {
            self.converse(room, &text).await
        };
        self.send_reply(room, msg, &reply).await
    }

    async fn send_reply<R: ChatRoom>(
        &self,
        room: &R,
        msg: &IncomingMessage,
        reply: &str,
    ) -> Result<()> {
        let content = MessageContent::html(reply, markdown_to_html(reply));
        room.reply(&msg.event_id, content)
            .await
            .with_context(|| format!("Failed to send reply in {}", room.id()))
    }
}

// ABOUTME: Converts Matrix sync events into aibot-core events and hands them to the router.
// ABOUTME: Text/notice messages go to handle_message, membership changes to handle_room_join.

use crate::matrix_interface::MatrixInterface;
use aibot_core::traits::{IncomingMessage, Membership, MembershipEvent};
use aibot_core::Router;
use anyhow::Result;
use matrix_sdk::{
    room::Room,
    ruma::events::room::{
        member::{MembershipState, OriginalSyncRoomMemberEvent},
        message::{MessageFormat, MessageType, OriginalSyncRoomMessageEvent, Relation},
    },
    RoomState,
};

/// Text or notice message as a router message; `None` for anything else
pub fn incoming_message(room_id: &str, event: &OriginalSyncRoomMessageEvent) -> Option<IncomingMessage> {
    let (body, formatted) = match &event.content.msgtype {
        MessageType::Text(text) => (&text.body, &text.formatted),
        MessageType::Notice(notice) => (&notice.body, &notice.formatted),
        _ => return None,
    };

    let mut msg = IncomingMessage::new(
        room_id,
        event.sender.as_str(),
        event.event_id.as_str(),
        body.as_str(),
    );
    if let Some(formatted) = formatted.as_ref().filter(|f| f.format == MessageFormat::Html) {
        msg = msg.with_formatted_body(formatted.body.as_str());
    }
    if let Some(Relation::Reply { in_reply_to }) = &event.content.relates_to {
        msg = msg.replying_to(in_reply_to.event_id.as_str());
    }
    Some(msg)
}

/// Membership change as a router event; `None` for custom states
pub fn membership_event(room_id: &str, event: &OriginalSyncRoomMemberEvent) -> Option<MembershipEvent> {
    let membership = match event.content.membership {
        MembershipState::Join => Membership::Join,
        MembershipState::Invite => Membership::Invite,
        MembershipState::Leave => Membership::Leave,
        MembershipState::Ban => Membership::Ban,
        MembershipState::Knock => Membership::Knock,
        _ => return None,
    };
    Some(MembershipEvent {
        room_id: room_id.to_string(),
        target: event.state_key.to_string(),
        membership,
    })
}

pub async fn handle_message(
    router: &Router,
    chat: &MatrixInterface,
    room: Room,
    event: OriginalSyncRoomMessageEvent,
) -> Result<()> {
    if room.state() != RoomState::Joined {
        return Ok(());
    }
    let Some(msg) = incoming_message(room.room_id().as_str(), &event) else {
        return Ok(());
    };

    let preview: String = msg.body.chars().take(50).collect();
    tracing::debug!(
        room_id = %msg.room_id,
        sender = %msg.sender.id,
        preview,
        "Received message"
    );

    let room = chat.wrap(room);
    router.handle_message(chat, &room, &msg).await
}

pub async fn handle_membership(
    router: &Router,
    chat: &MatrixInterface,
    room: Room,
    event: OriginalSyncRoomMemberEvent,
) -> Result<()> {
    let Some(event) = membership_event(room.room_id().as_str(), &event) else {
        return Ok(());
    };
    router.handle_room_join(chat, &event).await
}

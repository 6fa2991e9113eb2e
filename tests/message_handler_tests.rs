// ABOUTME: Tests for converting Matrix sync events into router events
// ABOUTME: Events are built from JSON the way the homeserver delivers them

use aibot::message_handler::{incoming_message, membership_event};
use aibot::traits::Membership;
use matrix_sdk::ruma::events::room::{
    member::OriginalSyncRoomMemberEvent, message::OriginalSyncRoomMessageEvent,
};
use serde_json::{json, Value};

const ROOM: &str = "!room:example.com";

fn message(content: Value) -> OriginalSyncRoomMessageEvent {
    serde_json::from_value(json!({
        "type": "m.room.message",
        "event_id": "$event:example.com",
        "sender": "@alice:example.com",
        "origin_server_ts": 1700000000000u64,
        "content": content,
    }))
    .unwrap()
}

fn member(target: &str, membership: &str) -> OriginalSyncRoomMemberEvent {
    serde_json::from_value(json!({
        "type": "m.room.member",
        "event_id": "$member:example.com",
        "sender": target,
        "state_key": target,
        "origin_server_ts": 1700000000000u64,
        "content": { "membership": membership },
    }))
    .unwrap()
}

#[test]
fn test_plain_text_message() {
    let event = message(json!({"msgtype": "m.text", "body": "AI hello"}));
    let msg = incoming_message(ROOM, &event).unwrap();
    assert_eq!(msg.room_id, ROOM);
    assert_eq!(msg.sender.id, "@alice:example.com");
    assert_eq!(msg.event_id, "$event:example.com");
    assert_eq!(msg.body, "AI hello");
    assert!(msg.formatted_body.is_none());
    assert!(msg.in_reply_to.is_none());
}

#[test]
fn test_html_message_keeps_formatted_body() {
    let event = message(json!({
        "msgtype": "m.text",
        "body": "aibot: hi",
        "format": "org.matrix.custom.html",
        "formatted_body": "<a href=\"https://matrix.to/#/@aibot:example.com\">aibot</a>: hi",
    }));
    let msg = incoming_message(ROOM, &event).unwrap();
    assert_eq!(
        msg.formatted_body.as_deref(),
        Some("<a href=\"https://matrix.to/#/@aibot:example.com\">aibot</a>: hi")
    );
}

#[test]
fn test_reply_relation_is_captured() {
    let event = message(json!({
        "msgtype": "m.text",
        "body": "and then?",
        "m.relates_to": { "m.in_reply_to": { "event_id": "$parent:example.com" } },
    }));
    let msg = incoming_message(ROOM, &event).unwrap();
    assert_eq!(msg.in_reply_to.as_deref(), Some("$parent:example.com"));
}

#[test]
fn test_notice_is_accepted() {
    let event = message(json!({"msgtype": "m.notice", "body": "#AI status"}));
    assert_eq!(incoming_message(ROOM, &event).unwrap().body, "#AI status");
}

#[test]
fn test_non_text_messages_are_skipped() {
    let event = message(json!({
        "msgtype": "m.image",
        "body": "cat.png",
        "url": "mxc://example.com/abc",
    }));
    assert!(incoming_message(ROOM, &event).is_none());
}

#[test]
fn test_join_membership() {
    let event = member("@aibot:example.com", "join");
    let change = membership_event(ROOM, &event).unwrap();
    assert_eq!(change.room_id, ROOM);
    assert_eq!(change.target, "@aibot:example.com");
    assert_eq!(change.membership, Membership::Join);
}

#[test]
fn test_other_memberships() {
    assert_eq!(
        membership_event(ROOM, &member("@bob:example.com", "leave")).unwrap().membership,
        Membership::Leave
    );
    assert_eq!(
        membership_event(ROOM, &member("@bob:example.com", "invite")).unwrap().membership,
        Membership::Invite
    );
}

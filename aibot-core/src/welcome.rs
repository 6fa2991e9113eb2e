// ABOUTME: Welcome notice sent the first time the bot joins a room.
// ABOUTME: Default texts plus the account-data marker that records it was sent.

use crate::html::html_to_plain;
use crate::traits::MessageContent;
use serde_json::{json, Value};

pub const DEFAULT_WELCOME_DIRECT: &str = "I am your friendly neighbourhood AI assistant! <br><br>\
All messages in this chat will be shared with the language model provider.";

pub const DEFAULT_WELCOME_GROUP: &str = "I am your friendly neighbourhood AI assistant! \
To ask me something, send a message starting with @AI or mention #AI.<br><br>\
All messages in this chat will be shared with the language model provider.";

/// Field stored under the join marker key
const MARKER_FIELD: &str = "join_message_sent";

/// Account-data value recording that the welcome went out
pub fn marker_value() -> Value {
    json!({ MARKER_FIELD: true })
}

/// Whether stored account data says the welcome was already sent
pub fn is_marker_set(data: Option<&Value>) -> bool {
    data.and_then(|v| v.get(MARKER_FIELD))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Dual-format notice: the HTML as given, plus a plain body derived from it
pub fn notice(html: &str) -> MessageContent {
    MessageContent::html(html_to_plain(html), html)
}

// ABOUTME: Command parsing for room messages.
// ABOUTME: Recognizes !gpt3.5, !gpt4 and !clear, with !! as an escape for plain text.

use crate::conversation::ModelVersion;

/// A bot command recognized in a message body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Switch the room to the given model version
    UseModel(ModelVersion),
    /// Discard the room's conversation
    Clear,
    /// Any other `!name`; never answered
    Unknown(String),
}

impl Command {
    fn from_name(name: &str) -> Self {
        if let Some(version) = ModelVersion::from_command(name) {
            return Command::UseModel(version);
        }
        match name {
            "clear" => Command::Clear,
            other => Command::Unknown(other.to_string()),
        }
    }
}

/// Result of parsing a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseResult {
    /// A command was recognized
    Command(Command),
    /// A regular message (not a command)
    Message(String),
    /// Message should be ignored (empty, escape sequence, etc.)
    Ignore,
}

impl ParseResult {
    /// Returns true if this is a command
    pub fn is_command(&self) -> bool {
        matches!(self, ParseResult::Command(_))
    }

    /// Get the message text if this is a regular message
    pub fn as_message(&self) -> Option<&str> {
        match self {
            ParseResult::Message(msg) => Some(msg),
            _ => None,
        }
    }
}

/// Parse a chat message to determine if it's a command
///
/// # Command Recognition
/// `!name` where name starts with a letter. The name is the first
/// whitespace-delimited word, lowercased; anything after it is ignored.
///
/// # Escape Sequences
/// - Messages starting with `!!` are treated as regular messages (escape)
/// - Empty messages are ignored
pub fn parse_message(body: &str) -> ParseResult {
    let trimmed = body.trim();

    if trimmed.is_empty() {
        return ParseResult::Ignore;
    }

    // Escape sequence: !! at start means treat as regular message
    if let Some(escaped) = trimmed.strip_prefix("!!") {
        let escaped = escaped.trim();
        if escaped.is_empty() {
            return ParseResult::Ignore;
        }
        return ParseResult::Message(escaped.to_string());
    }

    if let Some(after_bang) = trimmed.strip_prefix('!') {
        // Must start with an alphabetic character
        if after_bang.chars().next().is_some_and(|c| c.is_alphabetic()) {
            let name = after_bang
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_lowercase();
            return ParseResult::Command(Command::from_name(&name));
        }
    }

    ParseResult::Message(trimmed.to_string())
}

/// Whether addressed text asks for the conversation to be cleared
pub fn requests_clear(text: &str) -> bool {
    text.split_whitespace()
        .any(|word| word.eq_ignore_ascii_case("!clear"))
}

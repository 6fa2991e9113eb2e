// ABOUTME: Summarizing conversation memory with a bounded token budget.
// ABOUTME: Recent turns stay verbatim; older ones get folded into a running summary.

use crate::Turn;

/// Rough token estimate: 1 token ≈ 4 characters
pub const CHARS_PER_TOKEN: usize = 4;

pub const DEFAULT_MAX_TOKEN_LIMIT: usize = 200;

pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Per-session memory: a running summary plus a buffer of recent turns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryBuffer {
    summary: String,
    buffer: Vec<Turn>,
    max_token_limit: usize,
}

impl SummaryBuffer {
    pub fn new(max_token_limit: usize) -> Self {
        Self {
            summary: String::new(),
            buffer: Vec::new(),
            max_token_limit,
        }
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn buffer(&self) -> &[Turn] {
        &self.buffer
    }

    pub fn set_summary(&mut self, summary: impl Into<String>) {
        self.summary = summary.into().trim().to_string();
    }

    pub fn push(&mut self, turn: Turn) {
        self.buffer.push(turn);
    }

    pub fn buffer_tokens(&self) -> usize {
        self.buffer.iter().map(|t| estimate_tokens(&t.content)).sum()
    }

    /// Remove the oldest turns until the buffer fits the budget.
    ///
    /// Returns the removed turns (oldest first) so the caller can fold them
    /// into the summary. Empty when nothing needed pruning.
    pub fn take_overflow(&mut self) -> Vec<Turn> {
        let mut pruned = Vec::new();
        let mut tokens = self.buffer_tokens();
        while tokens > self.max_token_limit && !self.buffer.is_empty() {
            let turn = self.buffer.remove(0);
            tokens -= estimate_tokens(&turn.content);
            pruned.push(turn);
        }
        pruned
    }

    /// Turns to prepend to a prompt: the summary as a system turn, then the buffer
    pub fn context(&self) -> Vec<Turn> {
        let mut turns = Vec::with_capacity(self.buffer.len() + 1);
        if !self.summary.is_empty() {
            turns.push(Turn::system(format!(
                "Summary of the earlier conversation: {}",
                self.summary
            )));
        }
        turns.extend(self.buffer.iter().cloned());
        turns
    }
}

/// Prompt asking the model to extend `summary` with `new_turns`
pub fn summarization_prompt(summary: &str, new_turns: &[Turn]) -> String {
    let lines = new_turns
        .iter()
        .map(|t| {
            let speaker = match t.role {
                crate::Role::System => "System",
                crate::Role::User => "Human",
                crate::Role::Assistant => "AI",
            };
            format!("{}: {}", speaker, t.content)
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Progressively summarize the lines of conversation provided, adding onto the previous \
         summary and returning a new summary. Keep it short.\n\n\
         Current summary:\n{}\n\nNew lines of conversation:\n{}\n\nNew summary:",
        if summary.is_empty() { "(none)" } else { summary },
        lines
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn test_no_overflow_under_budget() {
        let mut memory = SummaryBuffer::new(200);
        memory.push(Turn::user("hello"));
        memory.push(Turn::assistant("hi there"));
        assert!(memory.take_overflow().is_empty());
        assert_eq!(memory.buffer().len(), 2);
    }

    #[test]
    fn test_overflow_removes_oldest_first() {
        let mut memory = SummaryBuffer::new(10);
        memory.push(Turn::user("a".repeat(20))); // 5 tokens
        memory.push(Turn::assistant("b".repeat(20))); // 5 tokens
        memory.push(Turn::user("c".repeat(20))); // 5 tokens

        let pruned = memory.take_overflow();
        assert_eq!(pruned.len(), 1);
        assert_eq!(pruned[0].content, "a".repeat(20));
        assert_eq!(memory.buffer().len(), 2);
        assert!(memory.buffer_tokens() <= 10);
    }

    #[test]
    fn test_context_includes_summary_first() {
        let mut memory = SummaryBuffer::new(200);
        memory.set_summary("  The human asked about Rust.  ");
        memory.push(Turn::user("and Go?"));

        let context = memory.context();
        assert_eq!(context.len(), 2);
        assert_eq!(context[0].role, crate::Role::System);
        assert!(context[0].content.ends_with("The human asked about Rust."));
        assert_eq!(context[1], Turn::user("and Go?"));
    }

    #[test]
    fn test_context_without_summary() {
        let mut memory = SummaryBuffer::new(200);
        memory.push(Turn::user("hi"));
        assert_eq!(memory.context(), vec![Turn::user("hi")]);
    }

    #[test]
    fn test_summarization_prompt_lists_speakers() {
        let prompt = summarization_prompt("", &[Turn::user("2+2?"), Turn::assistant("4")]);
        assert!(prompt.contains("(none)"));
        assert!(prompt.contains("Human: 2+2?"));
        assert!(prompt.contains("AI: 4"));
    }
}

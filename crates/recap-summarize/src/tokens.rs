//! Word-based token estimation.
//!
//! Cheap and deterministic; good enough for thresholds and bookkeeping, not for
//! exact context-window arithmetic.

use recap_persist::Message;

/// Estimated tokens per whitespace-separated word, in tenths (1.3)
const TENTHS_PER_WORD: u64 = 13;

/// `ceil(words * 1.3)`
pub fn estimate_tokens(text: &str) -> u64 {
    let words = text.split_whitespace().count() as u64;
    (words * TENTHS_PER_WORD).div_ceil(10)
}

/// Estimated tokens over the text and tool-result parts of one message
pub fn estimate_message_tokens(message: &Message) -> u64 {
    message
        .parts
        .iter()
        .map(|part| {
            if let Some(text) = part.as_text() {
                estimate_tokens(text)
            } else if let Some(result) = part.as_tool_result() {
                estimate_tokens(result.tool_name) + estimate_tokens(&result.output_text())
            } else {
                0
            }
        })
        .sum()
}

pub fn estimate_messages_tokens(messages: &[Message]) -> u64 {
    messages.iter().map(estimate_message_tokens).sum()
}

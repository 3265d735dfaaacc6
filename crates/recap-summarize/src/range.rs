use recap_persist::{Message, MessageRange, SummaryRecord};

use crate::tokens::estimate_messages_tokens;

/// A resolved range plus the estimated size of its source material
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputedRange {
    pub range: MessageRange,
    pub source_token_count: u64,
}

impl ComputedRange {
    pub fn message_count(&self) -> usize {
        self.range.message_count
    }
}

/// Compute the unsummarized slice of `messages`
///
/// Resumes right after `latest`'s last message when it is still present, and
/// rescans from index 0 when it is not. A tail shorter than `fallback_window` is
/// widened to the last `fallback_window` messages so a caught-up thread can still
/// be re-summarized. Returns `None` when the resolved slice is empty, which
/// covers an empty thread and a caught-up thread with a zero window.
pub fn compute_range(
    messages: &[Message],
    latest: Option<&SummaryRecord>,
    fallback_window: usize,
) -> Option<ComputedRange> {
    if messages.is_empty() {
        return None;
    }

    let resume_index = latest
        .and_then(|summary| {
            messages
                .iter()
                .position(|m| m.id == summary.message_range.to_message_id)
        })
        .map(|position| position + 1)
        .unwrap_or(0);

    let tail_len = messages.len() - resume_index;
    let start_index = if tail_len < fallback_window {
        messages.len().saturating_sub(fallback_window)
    } else {
        resume_index
    };

    let slice = &messages[start_index..];
    let (first, last) = (slice.first()?, slice.last()?);
    let to_index = messages.len() - 1;

    Some(ComputedRange {
        range: MessageRange {
            from_message_id: first.id.clone(),
            to_message_id: last.id.clone(),
            message_count: slice.len(),
            from_index: start_index,
            to_index,
        },
        source_token_count: estimate_messages_tokens(slice),
    })
}

/// Re-resolve a stored range against the current message sequence
///
/// Locates the range by message ids; if either endpoint has vanished, falls back
/// to the recorded indices clamped to the current sequence.
pub fn materialize<'a>(messages: &'a [Message], range: &MessageRange) -> &'a [Message] {
    let from = messages.iter().position(|m| m.id == range.from_message_id);
    let to = messages.iter().position(|m| m.id == range.to_message_id);

    match (from, to) {
        (Some(from), Some(to)) if from <= to => &messages[from..=to],
        _ => {
            if range.from_index >= messages.len() {
                return &[];
            }
            let to = range.to_index.min(messages.len() - 1).max(range.from_index);
            &messages[range.from_index..=to]
        }
    }
}

use recap_persist::{Message, SummaryContent};
use serde_json::{json, Value};

pub const SUMMARY_SCHEMA_NAME: &str = "conversation_summary";

pub const DEFAULT_SUMMARIZATION_PROMPT: &str = r#"You compress a slice of an ongoing conversation into a structured summary that will replace it in future context.

<previous_summary>

Summarize ONLY the new conversation below. Do not repeat anything already covered by the previous summary; build on it instead.

Return a single JSON object with exactly these fields:
- overview: 2-4 sentences describing what this part of the conversation was about (must not be empty)
- key_points: important facts, findings or conclusions
- decisions: decisions the user or assistant made
- action_items: concrete follow-ups still to be done
- open_questions: questions raised but not yet answered
- tool_results: notable tool outputs, each {tool_name, summary, importance} where importance is "high", "medium" or "low"

Use empty arrays for fields with nothing to report.

New conversation:
<transcript>"#;

const NO_PREVIOUS_SUMMARY: &str = "There is no previous summary; this is the start of the conversation.";

/// Per-line character caps for the transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscriptLimits {
    pub max_line_chars: usize,
    pub max_tool_output_chars: usize,
}

/// Strict JSON schema for [`SummaryContent`]
pub fn summary_schema() -> Value {
    let string_list = json!({ "type": "array", "items": { "type": "string" } });

    json!({
        "type": "object",
        "properties": {
            "overview": { "type": "string" },
            "key_points": string_list,
            "decisions": string_list,
            "action_items": string_list,
            "open_questions": string_list,
            "tool_results": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "tool_name": { "type": "string" },
                        "summary": { "type": "string" },
                        "importance": { "type": "string", "enum": ["high", "medium", "low"] }
                    },
                    "required": ["tool_name", "summary", "importance"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["overview", "key_points", "decisions", "action_items", "open_questions", "tool_results"],
        "additionalProperties": false
    })
}

/// Full prompt: previous summary as do-not-repeat context, then the transcript
pub fn build_summary_prompt(
    messages: &[Message],
    previous: Option<&SummaryContent>,
    limits: TranscriptLimits,
) -> String {
    let previous_text = previous
        .map(format_previous_summary)
        .unwrap_or_else(|| NO_PREVIOUS_SUMMARY.to_string());

    DEFAULT_SUMMARIZATION_PROMPT
        .replace("<previous_summary>", &previous_text)
        .replace("<transcript>", &format_transcript(messages, limits))
}

fn format_previous_summary(summary: &SummaryContent) -> String {
    let mut text = format!("Previous summary (already known, do not duplicate):\n{}", summary.overview);
    if !summary.key_points.is_empty() {
        text.push_str("\nKey points:");
        for point in &summary.key_points {
            text.push_str("\n- ");
            text.push_str(point);
        }
    }
    text
}

/// Role-prefixed text lines plus condensed tool-result lines
pub fn format_transcript(messages: &[Message], limits: TranscriptLimits) -> String {
    let mut lines = Vec::new();

    for message in messages {
        let text = message.text_content();
        if !text.trim().is_empty() {
            lines.push(format!(
                "{}: {}",
                message.role.as_str(),
                truncate(text.trim(), limits.max_line_chars)
            ));
        }

        for result in message.parts.iter().filter_map(|p| p.as_tool_result()) {
            lines.push(format!(
                "[tool {}]: {}",
                result.tool_name,
                truncate(&result.output_text(), limits.max_tool_output_chars)
            ));
        }
    }

    lines.join("\n")
}

/// Cut to at most `max_chars` characters, marking the cut with an ellipsis
pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => format!("{}…", &text[..byte_index]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recap_persist::{MessagePart, MessageRole};

    const LIMITS: TranscriptLimits = TranscriptLimits {
        max_line_chars: 20,
        max_tool_output_chars: 10,
    };

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ãããããã", 3), "ããã…");
        assert_eq!(truncate("exact", 5), "exact");
    }

    #[test]
    fn test_transcript_lines() {
        let messages = vec![
            Message::text("t", MessageRole::User, "What's the weather in Lisbon today?"),
            Message::new(
                "t",
                MessageRole::Assistant,
                vec![
                    MessagePart::Reasoning { text: "hidden".to_string() },
                    MessagePart::ToolResult {
                        tool_call_id: None,
                        tool_name: "weather".to_string(),
                        output: json!("sunny, 24C, light wind from north"),
                    },
                    MessagePart::Text { text: "Sunny.".to_string() },
                ],
            ),
        ];

        let transcript = format_transcript(&messages, LIMITS);
        let lines: Vec<&str> = transcript.lines().collect();

        assert_eq!(lines[0], "user: What's the weather i…");
        assert_eq!(lines[1], "assistant: Sunny.");
        assert_eq!(lines[2], "[tool weather]: sunny, 24C…");
        assert!(!transcript.contains("hidden"));
    }

    #[test]
    fn test_prompt_embeds_previous_summary() {
        let previous = SummaryContent {
            overview: "Planning a trip".to_string(),
            key_points: vec!["Budget is 2k".to_string()],
            ..Default::default()
        };
        let messages = vec![Message::text("t", MessageRole::User, "Book the hotel")];

        let prompt = build_summary_prompt(&messages, Some(&previous), LIMITS);
        assert!(prompt.contains("Planning a trip"));
        assert!(prompt.contains("- Budget is 2k"));
        assert!(prompt.contains("user: Book the hotel"));
        assert!(!prompt.contains("<transcript>"));

        let first = build_summary_prompt(&messages, None, LIMITS);
        assert!(first.contains(NO_PREVIOUS_SUMMARY));
    }

    #[test]
    fn test_schema_requires_every_field() {
        let schema = summary_schema();
        let required = schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 6);
        assert_eq!(schema["additionalProperties"], false);
    }
}

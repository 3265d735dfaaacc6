use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Database-agnostic message model
///
/// Messages are append-only; `updated_at` is the ordering key within a thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub thread_id: String,
    pub role: MessageRole,
    pub parts: Vec<MessagePart>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Message {
    pub fn new(thread_id: impl Into<String>, role: MessageRole, parts: Vec<MessagePart>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            thread_id: thread_id.into(),
            role,
            parts,
            created_at: now,
            updated_at: now,
        }
    }

    /// Single text part message
    pub fn text(thread_id: impl Into<String>, role: MessageRole, text: impl Into<String>) -> Self {
        Self::new(thread_id, role, vec![MessagePart::Text { text: text.into() }])
    }

    /// All text parts joined with newlines
    pub fn text_content(&self) -> String {
        self.parts
            .iter()
            .filter_map(MessagePart::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
    Tool,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
            Self::Tool => "tool",
        }
    }
}

/// One piece of message content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagePart {
    Text {
        text: String,
    },
    Reasoning {
        text: String,
    },
    ToolCall {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_call_id: Option<String>,
        tool_name: String,
        #[serde(default)]
        input: Value,
    },
    ToolResult {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_call_id: Option<String>,
        tool_name: String,
        #[serde(default)]
        output: Value,
    },
    Data {
        data: Value,
    },
    Source {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    File {
        media_type: String,
        url: String,
    },
}

impl MessagePart {
    /// Text of a `Text` part; reasoning and every other kind yield `None`
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }

    pub fn as_tool_result(&self) -> Option<ToolResultView<'_>> {
        match self {
            Self::ToolResult { tool_name, output, .. } => {
                Some(ToolResultView { tool_name, output })
            }
            _ => None,
        }
    }
}

/// Borrowed view over a tool-result part
#[derive(Debug, Clone, Copy)]
pub struct ToolResultView<'a> {
    pub tool_name: &'a str,
    pub output: &'a Value,
}

impl ToolResultView<'_> {
    /// Output as plain text: strings verbatim, anything else as compact JSON
    pub fn output_text(&self) -> String {
        match self.output {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

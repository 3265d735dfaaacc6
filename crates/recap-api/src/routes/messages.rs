use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use recap_persist::{Message, MessagePart, MessageRole};
use recap_summarize::{estimate_message_tokens, SummarizeOutcome};

use crate::{
    error::{ApiError, ApiResult},
    routes::threads::require_thread,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default = "default_role")]
    pub role: MessageRole,
    /// Shorthand for a single text part
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

fn default_role() -> MessageRole {
    MessageRole::User
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub message: Message,
    pub token_estimate: u64,
    /// Present when this message pushed the thread over an auto-summarization threshold
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_summary: Option<SummarizeOutcome>,
}

#[derive(Debug, Deserialize)]
pub struct ListMessagesQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    pub before: Option<String>,
}

fn default_limit() -> usize {
    50
}

#[derive(Debug, Serialize)]
pub struct ListMessagesResponse {
    pub messages: Vec<Message>,
    pub has_more: bool,
}

/// Append a message, then feed the automatic summarization trigger
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<(StatusCode, Json<SendMessageResponse>)> {
    require_thread(&state, &thread_id).await?;

    let mut parts = req.parts;
    if let Some(text) = req.content {
        parts.insert(0, MessagePart::Text { text });
    }
    if parts.is_empty() {
        return Err(ApiError::BadRequest("message needs `content` or `parts`".to_string()));
    }

    let message = Message::new(&thread_id, req.role, parts);
    let token_estimate = estimate_message_tokens(&message);
    state.persist.save_message(message.clone()).await?;

    let auto_summary = state
        .summarizer
        .update_thread_counters(&thread_id, 1, token_estimate)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SendMessageResponse {
            message,
            token_estimate,
            auto_summary,
        }),
    ))
}

/// List messages in a thread, oldest first
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
    Query(query): Query<ListMessagesQuery>,
) -> ApiResult<Json<ListMessagesResponse>> {
    require_thread(&state, &thread_id).await?;

    let limit = query.limit.min(100); // Cap at 100
    let all_messages = state.persist.list_messages(&thread_id).await?;

    // `before` keeps only messages preceding that id; the newest `limit` of those are returned
    let end = query
        .before
        .and_then(|before| all_messages.iter().position(|m| m.id == before))
        .unwrap_or(all_messages.len());
    let start = end.saturating_sub(limit);

    Ok(Json(ListMessagesResponse {
        has_more: start > 0,
        messages: all_messages[start..end].to_vec(),
    }))
}

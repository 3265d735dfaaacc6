use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use recap_persist::{Thread, ThreadMetadata};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct CreateThreadRequest {
    pub user_id: String,
    #[serde(default)]
    pub metadata: ThreadMetadata,
}

#[derive(Debug, Serialize)]
pub struct ThreadResponse {
    pub thread_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub metadata: ThreadMetadata,
    pub summarization: SummarizationState,
}

/// Denormalized counters driving the automatic trigger
#[derive(Debug, Serialize)]
pub struct SummarizationState {
    pub messages_since_last_summary: u64,
    pub tokens_since_last_summary: u64,
    pub summary_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_summary_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_summary_at: Option<DateTime<Utc>>,
    pub in_progress: bool,
}

/// Open a thread with zeroed summarization counters
pub async fn create_thread(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateThreadRequest>,
) -> ApiResult<(StatusCode, Json<ThreadResponse>)> {
    if body.user_id.trim().is_empty() {
        return Err(ApiError::BadRequest("user_id must not be empty".to_string()));
    }

    let thread = state.persist.create_thread(&body.user_id, body.metadata).await?;
    tracing::info!(thread_id = %thread.id, user_id = %thread.user_id, "Thread opened");

    Ok((StatusCode::CREATED, Json(thread.into())))
}

pub async fn get_thread(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<ThreadResponse>> {
    Ok(Json(require_thread(&state, &thread_id).await?.into()))
}

/// Load a thread or fail with 404
pub(crate) async fn require_thread(state: &AppState, thread_id: &str) -> ApiResult<Thread> {
    state
        .persist
        .get_thread(thread_id)
        .await?
        .ok_or_else(|| ApiError::ThreadNotFound(thread_id.to_string()))
}

impl From<Thread> for ThreadResponse {
    fn from(thread: Thread) -> Self {
        let in_progress = thread.active_summary_id.is_some();
        Self {
            thread_id: thread.id,
            user_id: thread.user_id,
            created_at: thread.created_at,
            updated_at: thread.updated_at,
            metadata: thread.metadata,
            summarization: SummarizationState {
                messages_since_last_summary: thread.messages_since_last_summary,
                tokens_since_last_summary: thread.tokens_since_last_summary,
                summary_count: thread.summary_count,
                last_summary_id: thread.last_summary_id,
                last_summary_at: thread.last_summary_at,
                in_progress,
            },
        }
    }
}

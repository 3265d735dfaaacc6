use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use recap_persist::SummaryRecord;
use recap_summarize::{ContextSummaries, SummarizeOutcome};

use crate::{error::ApiResult, routes::threads::require_thread, state::AppState};

#[derive(Debug, Serialize)]
pub struct SummaryListResponse {
    pub summaries: Vec<SummaryRecord>,
}

#[derive(Debug, Serialize)]
pub struct SummarizationStatusResponse {
    pub thread_id: String,
    pub in_progress: bool,
}

/// Manually trigger summarization
///
/// 202 when a run was accepted, 200 with `success: false` and a reason when refused.
pub async fn trigger_summary(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> ApiResult<(StatusCode, Json<SummarizeOutcome>)> {
    let outcome = state.summarizer.manual_summarize(&thread_id).await?;

    let status = if outcome.is_started() {
        StatusCode::ACCEPTED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(outcome)))
}

/// Recent summary records, any status, newest first
pub async fn list_summaries(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<SummaryListResponse>> {
    require_thread(&state, &thread_id).await?;
    let summaries = state.summarizer.get_thread_summaries(&thread_id).await?;
    Ok(Json(SummaryListResponse { summaries }))
}

/// Completed summaries for context assembly
pub async fn context_summaries(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<ContextSummaries>> {
    require_thread(&state, &thread_id).await?;
    Ok(Json(state.summarizer.get_latest_summaries_for_context(&thread_id).await?))
}

pub async fn summarization_status(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<SummarizationStatusResponse>> {
    require_thread(&state, &thread_id).await?;
    let in_progress = state.summarizer.is_summarization_in_progress(&thread_id).await?;
    Ok(Json(SummarizationStatusResponse { thread_id, in_progress }))
}

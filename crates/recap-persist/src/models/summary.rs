use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Structured summary produced by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SummaryContent {
    pub overview: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub decisions: Vec<String>,
    #[serde(default)]
    pub action_items: Vec<String>,
    #[serde(default)]
    pub open_questions: Vec<String>,
    #[serde(default)]
    pub tool_results: Vec<ToolResultSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultSummary {
    pub tool_name: String,
    pub summary: String,
    pub importance: Importance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    High,
    Medium,
    Low,
}

/// Contiguous slice of a thread's message sequence
///
/// Indices refer to the sequence snapshot the range was computed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRange {
    pub from_message_id: String,
    pub to_message_id: String,
    pub message_count: usize,
    pub from_index: usize,
    pub to_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerType {
    Auto,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStatus {
    Generating,
    Completed,
    Failed,
}

impl SummaryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generating => "generating",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Generating)
    }
}

impl fmt::Display for SummaryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryErrorInfo {
    pub message: String,
    pub fallback_attempts: usize,
    pub last_attempt_model: String,
}

/// One summarization attempt for a thread
///
/// Created `generating`, moves once to `completed` or `failed`, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub id: String,
    pub thread_id: String,
    pub summary: SummaryContent,
    pub message_range: MessageRange,
    pub source_token_count: u64,
    pub summary_token_count: u64,
    pub cost_usd: Option<f64>,
    pub model_used: String,
    pub trigger_type: TriggerType,
    pub status: SummaryStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub error_info: Option<SummaryErrorInfo>,
}

impl SummaryRecord {
    /// New in-flight record with an empty summary placeholder
    pub fn generating(
        thread_id: impl Into<String>,
        message_range: MessageRange,
        source_token_count: u64,
        model: impl Into<String>,
        trigger_type: TriggerType,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            thread_id: thread_id.into(),
            summary: SummaryContent::default(),
            message_range,
            source_token_count,
            summary_token_count: 0,
            cost_usd: None,
            model_used: model.into(),
            trigger_type,
            status: SummaryStatus::Generating,
            created_at: now,
            updated_at: now,
            error_info: None,
        }
    }

    /// Apply the `generating -> completed` transition in place
    pub fn apply_completion(&mut self, completion: SummaryCompletion) {
        self.summary = completion.summary;
        self.summary_token_count = completion.summary_token_count;
        self.cost_usd = completion.cost_usd;
        self.model_used = completion.model_used;
        self.status = SummaryStatus::Completed;
        self.updated_at = Utc::now();
    }

    /// Apply the `generating -> failed` transition in place
    pub fn apply_failure(&mut self, error_info: SummaryErrorInfo) {
        self.error_info = Some(error_info);
        self.status = SummaryStatus::Failed;
        self.updated_at = Utc::now();
    }
}

/// Fields attached when a record completes
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryCompletion {
    pub summary: SummaryContent,
    pub summary_token_count: u64,
    pub cost_usd: Option<f64>,
    pub model_used: String,
}

/// Result of trying to claim a thread for summarization
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimOutcome {
    Claimed(SummaryRecord),
    AlreadyInProgress,
}

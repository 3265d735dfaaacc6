use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Database-agnostic thread model
///
/// The `*_summary*` fields are denormalized counters owned by the summarizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub metadata: ThreadMetadata,
    pub last_summary_at: Option<DateTime<Utc>>,
    pub last_summary_id: Option<String>,
    pub messages_since_last_summary: u64,
    pub tokens_since_last_summary: u64,
    pub summary_count: u64,
    /// Set while a summary for this thread is `generating`
    pub active_summary_id: Option<String>,
}

impl Thread {
    pub fn new(user_id: impl Into<String>, metadata: ThreadMetadata) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            created_at: now,
            updated_at: now,
            metadata,
            last_summary_at: None,
            last_summary_id: None,
            messages_since_last_summary: 0,
            tokens_since_last_summary: 0,
            summary_count: 0,
            active_summary_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ThreadMetadata {
    pub title: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

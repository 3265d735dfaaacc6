use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{
    ClaimOutcome, Message, SummaryCompletion, SummaryErrorInfo, SummaryRecord, Thread,
    ThreadMetadata,
};

/// Trait for database persistence operations
///
/// Covers the message store the summarizer reads from and the summary record
/// store it owns. Implementations must make [`claim_summary`] atomic per thread.
///
/// [`claim_summary`]: PersistenceClient::claim_summary
#[async_trait]
pub trait PersistenceClient: Send + Sync {
    /// Create a new thread
    async fn create_thread(&self, user_id: &str, metadata: ThreadMetadata) -> Result<Thread>;

    /// Get a thread by ID
    async fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>>;

    /// Append a message to its thread
    async fn save_message(&self, message: Message) -> Result<()>;

    /// All messages for a thread, ordered by `updated_at` ascending (stable on ties)
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<Message>>;

    /// Add to the since-last-summary counters and return the updated thread
    async fn increment_thread_counters(
        &self,
        thread_id: &str,
        messages: u64,
        tokens: u64,
    ) -> Result<Thread>;

    /// Atomically claim the thread and insert `record` as its in-flight summary
    ///
    /// On success the thread's in-flight marker points at the record, its
    /// since-last-summary counters are zeroed and `last_summary_at`/`last_summary_id`
    /// are stamped. Returns `AlreadyInProgress` without writing anything if the
    /// thread already has an in-flight summary.
    async fn claim_summary(&self, record: SummaryRecord) -> Result<ClaimOutcome>;

    /// `generating -> completed`; increments the thread's `summary_count`
    async fn complete_summary(
        &self,
        summary_id: &str,
        completion: SummaryCompletion,
    ) -> Result<SummaryRecord>;

    /// `generating -> failed`
    async fn fail_summary(
        &self,
        summary_id: &str,
        error_info: SummaryErrorInfo,
    ) -> Result<SummaryRecord>;

    /// Get a summary record by ID
    async fn get_summary(&self, summary_id: &str) -> Result<Option<SummaryRecord>>;

    /// Most recent records first, any status
    async fn list_summaries(&self, thread_id: &str, limit: usize) -> Result<Vec<SummaryRecord>>;

    /// Most recent `completed` records first
    async fn latest_completed_summaries(
        &self,
        thread_id: &str,
        limit: usize,
    ) -> Result<Vec<SummaryRecord>>;

    /// Whether any record for the thread is `generating`
    async fn has_generating_summary(&self, thread_id: &str) -> Result<bool>;

    /// `generating` records created before `before`, across all threads
    async fn list_stale_generating(&self, before: DateTime<Utc>) -> Result<Vec<SummaryRecord>>;
}

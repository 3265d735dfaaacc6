use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::{PersistError, Result};
use crate::models::{
    ClaimOutcome, Message, SummaryCompletion, SummaryErrorInfo, SummaryRecord, SummaryStatus,
    Thread, ThreadMetadata,
};
use crate::trait_client::PersistenceClient;

#[derive(Default)]
struct MemoryState {
    threads: HashMap<String, Thread>,
    messages: HashMap<String, Vec<Message>>,
    /// Append-only, in creation order
    summaries: Vec<SummaryRecord>,
}

impl MemoryState {
    fn thread_mut(&mut self, thread_id: &str) -> Result<&mut Thread> {
        self.threads
            .get_mut(thread_id)
            .ok_or_else(|| PersistError::ThreadNotFound(thread_id.to_string()))
    }

    fn generating_mut(&mut self, summary_id: &str) -> Result<&mut SummaryRecord> {
        let record = self
            .summaries
            .iter_mut()
            .find(|s| s.id == summary_id)
            .ok_or_else(|| PersistError::SummaryNotFound(summary_id.to_string()))?;

        if record.status != SummaryStatus::Generating {
            return Err(PersistError::InvalidTransition {
                summary_id: summary_id.to_string(),
                status: record.status,
            });
        }
        Ok(record)
    }

    fn release_thread(&mut self, thread_id: &str, summary_id: &str, completed: bool) {
        if let Some(thread) = self.threads.get_mut(thread_id) {
            if thread.active_summary_id.as_deref() == Some(summary_id) {
                thread.active_summary_id = None;
            }
            if completed {
                thread.summary_count += 1;
            }
            thread.updated_at = Utc::now();
        }
    }
}

/// Process-local persistence backend
///
/// Every operation runs under one lock, which makes `claim_summary` a true
/// check-and-set. Used by tests and single-node deployments.
#[derive(Default)]
pub struct InMemoryPersistenceClient {
    state: RwLock<MemoryState>,
}

impl InMemoryPersistenceClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PersistenceClient for InMemoryPersistenceClient {
    async fn create_thread(&self, user_id: &str, metadata: ThreadMetadata) -> Result<Thread> {
        let thread = Thread::new(user_id, metadata);
        let mut state = self.state.write().await;
        state.threads.insert(thread.id.clone(), thread.clone());
        state.messages.insert(thread.id.clone(), Vec::new());
        Ok(thread)
    }

    async fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>> {
        Ok(self.state.read().await.threads.get(thread_id).cloned())
    }

    async fn save_message(&self, message: Message) -> Result<()> {
        let mut state = self.state.write().await;
        state.thread_mut(&message.thread_id)?.updated_at = Utc::now();
        state
            .messages
            .entry(message.thread_id.clone())
            .or_default()
            .push(message);
        Ok(())
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<Message>> {
        let mut messages = self
            .state
            .read()
            .await
            .messages
            .get(thread_id)
            .cloned()
            .unwrap_or_default();
        // sort_by_key is stable: insertion order breaks ties
        messages.sort_by_key(|m| m.updated_at);
        Ok(messages)
    }

    async fn increment_thread_counters(
        &self,
        thread_id: &str,
        messages: u64,
        tokens: u64,
    ) -> Result<Thread> {
        let mut state = self.state.write().await;
        let thread = state.thread_mut(thread_id)?;
        thread.messages_since_last_summary += messages;
        thread.tokens_since_last_summary += tokens;
        thread.updated_at = Utc::now();
        Ok(thread.clone())
    }

    async fn claim_summary(&self, record: SummaryRecord) -> Result<ClaimOutcome> {
        let mut state = self.state.write().await;
        let thread = state.thread_mut(&record.thread_id)?;

        if thread.active_summary_id.is_some() {
            return Ok(ClaimOutcome::AlreadyInProgress);
        }

        thread.active_summary_id = Some(record.id.clone());
        thread.last_summary_at = Some(record.created_at);
        thread.last_summary_id = Some(record.id.clone());
        thread.messages_since_last_summary = 0;
        thread.tokens_since_last_summary = 0;
        thread.updated_at = record.created_at;

        state.summaries.push(record.clone());
        Ok(ClaimOutcome::Claimed(record))
    }

    async fn complete_summary(
        &self,
        summary_id: &str,
        completion: SummaryCompletion,
    ) -> Result<SummaryRecord> {
        let mut state = self.state.write().await;
        let record = state.generating_mut(summary_id)?;
        record.apply_completion(completion);
        let record = record.clone();

        state.release_thread(&record.thread_id, summary_id, true);
        Ok(record)
    }

    async fn fail_summary(
        &self,
        summary_id: &str,
        error_info: SummaryErrorInfo,
    ) -> Result<SummaryRecord> {
        let mut state = self.state.write().await;
        let record = state.generating_mut(summary_id)?;
        record.apply_failure(error_info);
        let record = record.clone();

        state.release_thread(&record.thread_id, summary_id, false);
        Ok(record)
    }

    async fn get_summary(&self, summary_id: &str) -> Result<Option<SummaryRecord>> {
        let state = self.state.read().await;
        Ok(state.summaries.iter().find(|s| s.id == summary_id).cloned())
    }

    async fn list_summaries(&self, thread_id: &str, limit: usize) -> Result<Vec<SummaryRecord>> {
        let state = self.state.read().await;
        Ok(state
            .summaries
            .iter()
            .rev()
            .filter(|s| s.thread_id == thread_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn latest_completed_summaries(
        &self,
        thread_id: &str,
        limit: usize,
    ) -> Result<Vec<SummaryRecord>> {
        let state = self.state.read().await;
        Ok(state
            .summaries
            .iter()
            .rev()
            .filter(|s| s.thread_id == thread_id && s.status == SummaryStatus::Completed)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn has_generating_summary(&self, thread_id: &str) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state
            .summaries
            .iter()
            .any(|s| s.thread_id == thread_id && s.status == SummaryStatus::Generating))
    }

    async fn list_stale_generating(&self, before: DateTime<Utc>) -> Result<Vec<SummaryRecord>> {
        let state = self.state.read().await;
        Ok(state
            .summaries
            .iter()
            .filter(|s| s.status == SummaryStatus::Generating && s.created_at < before)
            .cloned()
            .collect())
    }
}

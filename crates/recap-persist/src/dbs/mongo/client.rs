use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::{bson::doc, Client};

use crate::dbs::mongo::models::{MongoMessage, MongoSummaryRecord};
use crate::dbs::mongo::repositories::{
    MongoMessageRepository, MongoSummaryRepository, MongoThreadRepository,
};
use crate::error::{PersistError, Result};
use crate::models::{
    ClaimOutcome, Message, SummaryCompletion, SummaryErrorInfo, SummaryRecord, SummaryStatus,
    Thread, ThreadMetadata,
};
use crate::trait_client::PersistenceClient;

pub struct MongoPersistenceClient {
    thread_repo: MongoThreadRepository,
    message_repo: MongoMessageRepository,
    summary_repo: MongoSummaryRepository,
}

impl MongoPersistenceClient {
    /// Connect to MongoDB and make sure the transcript index exists
    pub async fn connect(mongodb_uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(mongodb_uri)
            .await
            .map_err(|e| PersistError::Connection(e.to_string()))?;

        let message_repo = MongoMessageRepository::new(&client, database);
        message_repo.ensure_indexes().await?;

        Ok(Self {
            thread_repo: MongoThreadRepository::new(&client, database),
            message_repo,
            summary_repo: MongoSummaryRepository::new(&client, database),
        })
    }

    /// Point the thread's in-flight marker at `record`
    ///
    /// A marker left behind by a record that is terminal or gone (a release that
    /// failed after finalization) is taken over with a second compare-and-set.
    async fn claim_thread(&self, record: &SummaryRecord) -> Result<bool> {
        let claimed_at = bson::DateTime::from_chrono(record.created_at);
        let mut expected: Option<String> = None;

        for _ in 0..2 {
            let claimed = self
                .thread_repo
                .claim(&record.thread_id, &record.id, expected.as_deref(), claimed_at)
                .await?;
            if claimed.is_some() {
                return Ok(true);
            }

            let Some(thread) = self.thread_repo.get_thread(&record.thread_id).await? else {
                return Err(PersistError::ThreadNotFound(record.thread_id.clone()));
            };
            let Some(active) = thread.active_summary_id else {
                // Released between the two reads
                expected = None;
                continue;
            };

            let holder = self.summary_repo.get(&active).await?;
            if !is_orphaned_marker(holder.as_ref().map(|h| h.status)) {
                return Ok(false);
            }
            tracing::warn!(
                thread_id = %record.thread_id,
                stale_summary_id = %active,
                "Reclaiming thread from orphaned in-flight marker"
            );
            expected = Some(active);
        }

        Ok(false)
    }

    /// Distinguish "not found" from "not generating" after a failed conditional update
    async fn transition_error(&self, summary_id: &str) -> PersistError {
        match self.summary_repo.get(summary_id).await {
            Ok(Some(record)) => PersistError::InvalidTransition {
                summary_id: summary_id.to_string(),
                status: record.status,
            },
            Ok(None) => PersistError::SummaryNotFound(summary_id.to_string()),
            Err(e) => e,
        }
    }
}

#[async_trait]
impl PersistenceClient for MongoPersistenceClient {
    async fn create_thread(&self, user_id: &str, metadata: ThreadMetadata) -> Result<Thread> {
        let thread = Thread::new(user_id, metadata);
        self.thread_repo.create_thread(thread.into()).await.map(Thread::from)
    }

    async fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>> {
        let thread = self.thread_repo.get_thread(thread_id).await?;
        Ok(thread.map(Thread::from))
    }

    async fn save_message(&self, message: Message) -> Result<()> {
        let Some(seq) = self.thread_repo.next_message_seq(&message.thread_id).await? else {
            return Err(PersistError::ThreadNotFound(message.thread_id));
        };
        self.message_repo.append(MongoMessage::new(message, seq)).await
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<Message>> {
        let messages = self.message_repo.transcript(thread_id).await?;
        Ok(messages.into_iter().map(Message::from).collect())
    }

    async fn increment_thread_counters(
        &self,
        thread_id: &str,
        messages: u64,
        tokens: u64,
    ) -> Result<Thread> {
        let messages = i64::try_from(messages).unwrap_or(i64::MAX);
        let tokens = i64::try_from(tokens).unwrap_or(i64::MAX);

        self.thread_repo
            .increment_counters(thread_id, messages, tokens)
            .await?
            .map(Thread::from)
            .ok_or_else(|| PersistError::ThreadNotFound(thread_id.to_string()))
    }

    /// Inserts the record first so the thread marker never names a missing
    /// record, then compare-and-sets the marker. A loser deletes its insert.
    async fn claim_summary(&self, record: SummaryRecord) -> Result<ClaimOutcome> {
        self.summary_repo.insert(&MongoSummaryRecord::from(record.clone())).await?;

        let claimed = self.claim_thread(&record).await;
        if !matches!(claimed, Ok(true)) {
            if let Err(e) = self.summary_repo.delete(&record.id).await {
                tracing::error!(
                    thread_id = %record.thread_id,
                    summary_id = %record.id,
                    error = %e,
                    "Failed to drop unclaimed summary, sweep will fail it"
                );
            }
        }

        match claimed? {
            true => Ok(ClaimOutcome::Claimed(record)),
            false => Ok(ClaimOutcome::AlreadyInProgress),
        }
    }

    async fn complete_summary(
        &self,
        summary_id: &str,
        completion: SummaryCompletion,
    ) -> Result<SummaryRecord> {
        let set = doc! {
            "status": SummaryStatus::Completed.as_str(),
            "summary": bson::to_bson(&completion.summary)?,
            "summary_token_count":
                i64::try_from(completion.summary_token_count).unwrap_or(i64::MAX),
            "cost_usd": completion.cost_usd,
            "model_used": completion.model_used,
        };

        let record: SummaryRecord = match self.summary_repo.transition(summary_id, set).await? {
            Some(record) => record.into(),
            None => return Err(self.transition_error(summary_id).await),
        };

        self.thread_repo.increment_summary_count(&record.thread_id).await?;
        self.thread_repo.release(&record.thread_id, summary_id).await?;
        Ok(record)
    }

    async fn fail_summary(
        &self,
        summary_id: &str,
        error_info: SummaryErrorInfo,
    ) -> Result<SummaryRecord> {
        let set = doc! {
            "status": SummaryStatus::Failed.as_str(),
            "error_info": bson::to_bson(&error_info)?,
        };

        let record: SummaryRecord = match self.summary_repo.transition(summary_id, set).await? {
            Some(record) => record.into(),
            None => return Err(self.transition_error(summary_id).await),
        };

        self.thread_repo.release(&record.thread_id, summary_id).await?;
        Ok(record)
    }

    async fn get_summary(&self, summary_id: &str) -> Result<Option<SummaryRecord>> {
        Ok(self.summary_repo.get(summary_id).await?.map(SummaryRecord::from))
    }

    async fn list_summaries(&self, thread_id: &str, limit: usize) -> Result<Vec<SummaryRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let records = self.summary_repo.list_for_thread(thread_id, None, limit).await?;
        Ok(records.into_iter().map(SummaryRecord::from).collect())
    }

    async fn latest_completed_summaries(
        &self,
        thread_id: &str,
        limit: usize,
    ) -> Result<Vec<SummaryRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let records = self
            .summary_repo
            .list_for_thread(thread_id, Some(SummaryStatus::Completed.as_str()), limit)
            .await?;
        Ok(records.into_iter().map(SummaryRecord::from).collect())
    }

    async fn has_generating_summary(&self, thread_id: &str) -> Result<bool> {
        Ok(self.summary_repo.count_generating(thread_id).await? > 0)
    }

    async fn list_stale_generating(&self, before: DateTime<Utc>) -> Result<Vec<SummaryRecord>> {
        let records = self
            .summary_repo
            .list_generating_before(bson::DateTime::from_chrono(before))
            .await?;
        Ok(records.into_iter().map(SummaryRecord::from).collect())
    }
}

/// A marker is orphaned when its record is missing or already terminal
fn is_orphaned_marker(holder_status: Option<SummaryStatus>) -> bool {
    !matches!(holder_status, Some(SummaryStatus::Generating))
}

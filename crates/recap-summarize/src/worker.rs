use std::sync::Arc;

use recap_persist::{
    PersistenceClient, SummaryCompletion, SummaryErrorInfo, SummaryRecord, SummaryStatus,
};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::GenerationError;
use crate::generator::SummaryGenerator;
use crate::range::materialize;
use crate::tokens::estimate_tokens;

/// One queued generation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryJob {
    pub summary_id: String,
    pub thread_id: String,
}

/// Published after a record reaches a terminal state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryEvent {
    pub summary_id: String,
    pub thread_id: String,
    pub status: SummaryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Dequeues [`SummaryJob`]s, runs generation and finalizes the record
///
/// `run` is the production loop; tests call `drain` to process whatever is
/// queued synchronously.
pub struct SummaryWorker {
    jobs: mpsc::UnboundedReceiver<SummaryJob>,
    persist: Arc<dyn PersistenceClient>,
    generator: SummaryGenerator,
    events: broadcast::Sender<SummaryEvent>,
}

impl SummaryWorker {
    pub(crate) fn new(
        jobs: mpsc::UnboundedReceiver<SummaryJob>,
        persist: Arc<dyn PersistenceClient>,
        generator: SummaryGenerator,
        events: broadcast::Sender<SummaryEvent>,
    ) -> Self {
        Self {
            jobs,
            persist,
            generator,
            events,
        }
    }

    /// Process jobs until every sender is dropped
    pub async fn run(mut self) {
        info!("Summary worker started");
        while let Some(job) = self.jobs.recv().await {
            self.process(job).await;
        }
        info!("Summary worker stopped");
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Process every job queued right now; returns how many ran
    pub async fn drain(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(job) = self.jobs.try_recv() {
            self.process(job).await;
            processed += 1;
        }
        processed
    }

    /// Run one job to a terminal state
    ///
    /// Returns `None` when the record is gone or no longer `generating`, or when
    /// the finalizing write failed and the record was left in place.
    pub async fn process(&self, job: SummaryJob) -> Option<SummaryStatus> {
        let record = match self.persist.get_summary(&job.summary_id).await {
            Ok(Some(record)) if record.status == SummaryStatus::Generating => record,
            Ok(Some(record)) => {
                debug!(
                    summary_id = %job.summary_id,
                    status = %record.status,
                    "Summary already finalized, skipping job"
                );
                return None;
            }
            Ok(None) => {
                warn!(summary_id = %job.summary_id, "Summary record not found, skipping job");
                return None;
            }
            Err(e) => {
                error!(summary_id = %job.summary_id, error = %e, "Failed to load summary record");
                return None;
            }
        };

        match self.generate(&record).await {
            Ok(completion) => self.complete(&record, completion).await,
            Err(failure) => self.fail(&record, failure).await,
        }
    }

    async fn generate(&self, record: &SummaryRecord) -> Result<SummaryCompletion, GenerationError> {
        let read_failure =
            |message: String| GenerationError::new(message, 0, record.model_used.clone());

        let messages = self
            .persist
            .list_messages(&record.thread_id)
            .await
            .map_err(|e| read_failure(format!("Failed to load messages: {}", e)))?;

        let slice = materialize(&messages, &record.message_range);
        if slice.is_empty() {
            return Err(read_failure("Summary range no longer matches any messages".to_string()));
        }

        let previous = match self.persist.latest_completed_summaries(&record.thread_id, 1).await {
            Ok(mut summaries) => summaries.pop(),
            Err(e) => {
                warn!(
                    thread_id = %record.thread_id,
                    error = %e,
                    "Could not load previous summary, continuing without it"
                );
                None
            }
        };

        let generated = self
            .generator
            .generate(slice, previous.as_ref().map(|s| &s.summary))
            .await?;

        let serialized = serde_json::to_string(&generated.summary).unwrap_or_default();

        Ok(SummaryCompletion {
            summary_token_count: estimate_tokens(&serialized),
            summary: generated.summary,
            cost_usd: generated.cost_usd,
            model_used: generated.model_used,
        })
    }

    async fn complete(
        &self,
        record: &SummaryRecord,
        completion: SummaryCompletion,
    ) -> Option<SummaryStatus> {
        let model = completion.model_used.clone();
        match self.persist.complete_summary(&record.id, completion).await {
            Ok(updated) => {
                info!(
                    thread_id = %record.thread_id,
                    summary_id = %record.id,
                    model = %model,
                    summary_tokens = updated.summary_token_count,
                    "Summary completed"
                );
                self.publish(&updated, None);
                Some(SummaryStatus::Completed)
            }
            Err(e) => {
                error!(
                    thread_id = %record.thread_id,
                    summary_id = %record.id,
                    error = %e,
                    "Failed to finalize completed summary"
                );
                None
            }
        }
    }

    async fn fail(
        &self,
        record: &SummaryRecord,
        failure: GenerationError,
    ) -> Option<SummaryStatus> {
        warn!(
            thread_id = %record.thread_id,
            summary_id = %record.id,
            model = %failure.last_attempt_model,
            error = %failure.message,
            "Summary generation failed"
        );

        let message = failure.message.clone();
        match self.persist.fail_summary(&record.id, SummaryErrorInfo::from(failure)).await {
            Ok(updated) => {
                self.publish(&updated, Some(message));
                Some(SummaryStatus::Failed)
            }
            Err(e) => {
                error!(
                    thread_id = %record.thread_id,
                    summary_id = %record.id,
                    error = %e,
                    "Failed to finalize failed summary"
                );
                None
            }
        }
    }

    fn publish(&self, record: &SummaryRecord, error: Option<String>) {
        // No subscribers is fine
        let _ = self.events.send(SummaryEvent {
            summary_id: record.id.clone(),
            thread_id: record.thread_id.clone(),
            status: record.status,
            error,
        });
    }
}

use std::sync::Arc;

use chrono::Utc;
use recap_llm::StructuredClient;
use recap_persist::{ClaimOutcome, PersistenceClient, SummaryErrorInfo, SummaryRecord, TriggerType};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::config::SummarizationConfig;
use crate::error::{Result, SummarizeError};
use crate::generator::SummaryGenerator;
use crate::policy::{SkipReason, TriggerPolicy};
use crate::range::compute_range;
use crate::worker::{SummaryEvent, SummaryJob, SummaryWorker};

const EVENT_CAPACITY: usize = 64;
const TIMED_OUT_MESSAGE: &str = "summary generation timed out";

/// Synchronous answer to a trigger; completion is reported later via the record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummarizeOutcome {
    Started { summary_id: String },
    Skipped(SkipReason),
}

impl SummarizeOutcome {
    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started { .. })
    }

    pub fn summary_id(&self) -> Option<&str> {
        match self {
            Self::Started { summary_id } => Some(summary_id),
            Self::Skipped(_) => None,
        }
    }

    pub fn reason(&self) -> Option<SkipReason> {
        match self {
            Self::Started { .. } => None,
            Self::Skipped(reason) => Some(*reason),
        }
    }
}

#[derive(Serialize)]
struct OutcomeBody<'a> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<SkipReason>,
}

impl Serialize for SummarizeOutcome {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        OutcomeBody {
            success: self.is_started(),
            summary_id: self.summary_id(),
            reason: self.reason(),
        }
        .serialize(serializer)
    }
}

/// What context assembly reads before a model call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextSummaries {
    /// Completed only, most recent first
    pub summaries: Vec<SummaryRecord>,
    pub has_active_summary: bool,
}

/// Entry point for triggering and reading thread summaries
///
/// Triggers validate, claim and enqueue synchronously; generation runs on the
/// paired [`SummaryWorker`].
#[derive(Clone)]
pub struct Summarizer {
    persist: Arc<dyn PersistenceClient>,
    config: Arc<SummarizationConfig>,
    policy: TriggerPolicy,
    jobs: mpsc::UnboundedSender<SummaryJob>,
    events: broadcast::Sender<SummaryEvent>,
}

impl Summarizer {
    /// Build a summarizer and the worker that consumes its jobs
    pub fn new(
        persist: Arc<dyn PersistenceClient>,
        llm: Arc<dyn StructuredClient>,
        config: SummarizationConfig,
    ) -> (Self, SummaryWorker) {
        let config = Arc::new(config);
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let generator = SummaryGenerator::new(llm, Arc::clone(&config));
        let worker = SummaryWorker::new(jobs_rx, Arc::clone(&persist), generator, events.clone());

        let summarizer = Self {
            persist,
            policy: TriggerPolicy::from_config(&config),
            config,
            jobs: jobs_tx,
            events,
        };

        (summarizer, worker)
    }

    pub fn config(&self) -> &SummarizationConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SummaryEvent> {
        self.events.subscribe()
    }

    pub async fn manual_summarize(&self, thread_id: &str) -> Result<SummarizeOutcome> {
        self.summarize(thread_id, TriggerType::Manual).await
    }

    async fn summarize(&self, thread_id: &str, trigger: TriggerType) -> Result<SummarizeOutcome> {
        if self.persist.get_thread(thread_id).await?.is_none() {
            return Err(SummarizeError::ThreadNotFound(thread_id.to_string()));
        }

        let in_progress = self.persist.has_generating_summary(thread_id).await?;
        if let Err(reason) = self.policy.check_in_flight(in_progress) {
            return Ok(self.skipped(thread_id, trigger, reason));
        }

        let messages = self.persist.list_messages(thread_id).await?;
        let latest = self.persist.latest_completed_summaries(thread_id, 1).await?;
        let computed = compute_range(&messages, latest.first(), self.config.fallback_window);

        if let Err(reason) = self.policy.check_range(trigger, computed.as_ref()) {
            return Ok(self.skipped(thread_id, trigger, reason));
        }
        let Some(computed) = computed else {
            return Ok(self.skipped(thread_id, trigger, SkipReason::NoMessages));
        };

        let record = SummaryRecord::generating(
            thread_id,
            computed.range,
            computed.source_token_count,
            self.config.primary_model(),
            trigger,
        );

        let record = match self.persist.claim_summary(record).await? {
            ClaimOutcome::Claimed(record) => record,
            ClaimOutcome::AlreadyInProgress => {
                return Ok(self.skipped(thread_id, trigger, SkipReason::AlreadyInProgress));
            }
        };

        let job = SummaryJob {
            summary_id: record.id.clone(),
            thread_id: thread_id.to_string(),
        };
        if self.jobs.send(job).is_err() {
            error!(
                thread_id = %thread_id,
                summary_id = %record.id,
                "Summary worker is gone, failing record"
            );
            let error_info = SummaryErrorInfo {
                message: "summary worker is not running".to_string(),
                fallback_attempts: 0,
                last_attempt_model: record.model_used.clone(),
            };
            self.persist.fail_summary(&record.id, error_info).await?;
            return Err(SummarizeError::QueueClosed);
        }

        info!(
            thread_id = %thread_id,
            summary_id = %record.id,
            trigger = ?trigger,
            from_index = record.message_range.from_index,
            to_index = record.message_range.to_index,
            source_tokens = record.source_token_count,
            "Summarization started"
        );

        Ok(SummarizeOutcome::Started { summary_id: record.id })
    }

    fn skipped(
        &self,
        thread_id: &str,
        trigger: TriggerType,
        reason: SkipReason,
    ) -> SummarizeOutcome {
        debug!(%thread_id, ?trigger, %reason, "Summarization skipped");
        SummarizeOutcome::Skipped(reason)
    }

    /// Most recent records first, any status
    pub async fn get_thread_summaries(&self, thread_id: &str) -> Result<Vec<SummaryRecord>> {
        Ok(self
            .persist
            .list_summaries(thread_id, self.config.history_limit)
            .await?)
    }

    pub async fn get_latest_summaries_for_context(
        &self,
        thread_id: &str,
    ) -> Result<ContextSummaries> {
        let summaries = self
            .persist
            .latest_completed_summaries(thread_id, self.config.context_limit)
            .await?;
        let has_active_summary = self.persist.has_generating_summary(thread_id).await?;

        Ok(ContextSummaries {
            summaries,
            has_active_summary,
        })
    }

    pub async fn is_summarization_in_progress(&self, thread_id: &str) -> Result<bool> {
        Ok(self.persist.has_generating_summary(thread_id).await?)
    }

    /// Feed the automatic trigger after message ingestion
    ///
    /// Adds to the since-last-summary counters, then starts an automatic run when
    /// a threshold is crossed. Returns `None` if no run was attempted.
    pub async fn update_thread_counters(
        &self,
        thread_id: &str,
        message_count: u64,
        token_count: u64,
    ) -> Result<Option<SummarizeOutcome>> {
        let thread = self
            .persist
            .increment_thread_counters(thread_id, message_count, token_count)
            .await?;

        if !self.policy.should_auto_trigger(&thread) {
            return Ok(None);
        }

        debug!(
            thread_id = %thread_id,
            messages = thread.messages_since_last_summary,
            tokens = thread.tokens_since_last_summary,
            "Auto-summarization threshold reached"
        );
        self.summarize(thread_id, TriggerType::Auto).await.map(Some)
    }

    /// Fail every `generating` record older than the configured bound
    pub async fn sweep_stale_summaries(&self) -> Result<usize> {
        let cutoff = Utc::now() - self.config.stale_after();
        let stale = self.persist.list_stale_generating(cutoff).await?;

        let mut swept = 0;
        for record in stale {
            let error_info = SummaryErrorInfo {
                message: TIMED_OUT_MESSAGE.to_string(),
                fallback_attempts: 0,
                last_attempt_model: record.model_used.clone(),
            };

            match self.persist.fail_summary(&record.id, error_info).await {
                Ok(updated) => {
                    warn!(
                        thread_id = %record.thread_id,
                        summary_id = %record.id,
                        "Failed stale summary"
                    );
                    let _ = self.events.send(SummaryEvent {
                        summary_id: updated.id,
                        thread_id: updated.thread_id,
                        status: updated.status,
                        error: Some(TIMED_OUT_MESSAGE.to_string()),
                    });
                    swept += 1;
                }
                // Finalized by the worker since the listing
                Err(recap_persist::PersistError::InvalidTransition { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(swept)
    }
}

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use recap_llm::{CascadeClient, ChatClient, ChatRequest, ChatResponse, TokenUsage};
use recap_persist::{
    InMemoryPersistenceClient, Message, MessageRole, PersistenceClient, SummaryStatus,
    ThreadMetadata, TriggerType,
};
use recap_summarize::{
    estimate_message_tokens, SkipReason, SummarizationConfig, SummarizeOutcome, Summarizer,
    SummaryWorker,
};
use serde_json::json;

const MODELS: [&str; 3] = ["model-a", "model-b", "model-c"];

const VALID_SUMMARY: &str = r#"{
    "overview": "The user planned a trip to Lisbon.",
    "key_points": ["Budget is 2000 EUR"],
    "decisions": ["Fly on Friday"],
    "action_items": [],
    "open_questions": [],
    "tool_results": []
}"#;

/// Replies per model; `None` means the provider call errors
struct ScriptedChat {
    replies: Vec<(&'static str, Option<&'static str>)>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedChat {
    fn new(replies: Vec<(&'static str, Option<&'static str>)>) -> Arc<Self> {
        Arc::new(Self {
            replies,
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatClient for ScriptedChat {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        if let Some(message) = request.messages.first() {
            self.prompts.lock().unwrap().push(message.content.clone());
        }

        let reply = self
            .replies
            .iter()
            .find(|(model, _)| *model == request.model)
            .and_then(|(_, reply)| *reply);

        match reply {
            Some(content) => Ok(ChatResponse {
                content: Some(content.to_string()),
                usage: Some(TokenUsage::new(1_000, 100)),
                finish_reason: Some("stop".to_string()),
                model: Some(request.model),
                raw: json!({}),
            }),
            None => anyhow::bail!("rate limited"),
        }
    }
}

fn config() -> SummarizationConfig {
    SummarizationConfig::default()
        .with_candidate_models(MODELS.iter().map(|m| m.to_string()).collect())
        .with_pricing(
            "model-a",
            recap_summarize::ModelPricing { prompt: 0.000_001, completion: 0.000_002 },
        )
}

struct Harness {
    persist: Arc<InMemoryPersistenceClient>,
    summarizer: Summarizer,
    worker: SummaryWorker,
    chat: Arc<ScriptedChat>,
}

fn harness_with(chat: Arc<ScriptedChat>, config: SummarizationConfig) -> Harness {
    let persist = Arc::new(InMemoryPersistenceClient::new());
    let llm = Arc::new(CascadeClient::new(chat.clone()));
    let (summarizer, worker) = Summarizer::new(persist.clone(), llm, config);
    Harness {
        persist,
        summarizer,
        worker,
        chat,
    }
}

fn harness(replies: Vec<(&'static str, Option<&'static str>)>) -> Harness {
    harness_with(ScriptedChat::new(replies), config())
}

async fn thread_with_messages(persist: &InMemoryPersistenceClient, count: usize) -> (String, Vec<String>) {
    let thread = persist
        .create_thread("user-1", ThreadMetadata::default())
        .await
        .unwrap();
    let ids = add_messages(persist, &thread.id, 0, count).await;
    (thread.id, ids)
}

async fn add_messages(persist: &InMemoryPersistenceClient, thread_id: &str, start: usize, count: usize) -> Vec<String> {
    let mut ids = Vec::new();
    for i in start..start + count {
        let role = if i % 2 == 0 { MessageRole::User } else { MessageRole::Assistant };
        let message = Message::text(thread_id, role, format!("message number {}", i));
        ids.push(message.id.clone());
        persist.save_message(message).await.unwrap();
    }
    ids
}

fn started_id(outcome: &SummarizeOutcome) -> String {
    outcome.summary_id().expect("run should have started").to_string()
}

#[tokio::test]
async fn test_full_thread_summarized_without_prior_summary() {
    let mut h = harness(vec![("model-a", Some(VALID_SUMMARY))]);
    let (thread_id, ids) = thread_with_messages(&h.persist, 10).await;

    let outcome = h.summarizer.manual_summarize(&thread_id).await.unwrap();
    let summary_id = started_id(&outcome);

    let record = h.persist.get_summary(&summary_id).await.unwrap().unwrap();
    assert_eq!(record.status, SummaryStatus::Generating);
    assert_eq!(record.trigger_type, TriggerType::Manual);
    assert_eq!(record.message_range.from_index, 0);
    assert_eq!(record.message_range.to_index, 9);
    assert_eq!(record.message_range.message_count, 10);
    assert_eq!(record.message_range.from_message_id, ids[0]);
    assert_eq!(record.source_token_count, 40);
    assert_eq!(record.model_used, "model-a");

    assert_eq!(h.worker.drain().await, 1);

    let record = h.persist.get_summary(&summary_id).await.unwrap().unwrap();
    assert_eq!(record.status, SummaryStatus::Completed);
    assert_eq!(record.summary.overview, "The user planned a trip to Lisbon.");
    assert_eq!(record.model_used, "model-a");
    assert!(record.summary_token_count > 0);
    let cost = record.cost_usd.unwrap();
    assert!((cost - 0.0012).abs() < 1e-12);

    let thread = h.persist.get_thread(&thread_id).await.unwrap().unwrap();
    assert_eq!(thread.summary_count, 1);
    assert_eq!(thread.last_summary_id.as_deref(), Some(summary_id.as_str()));
    assert!(thread.active_summary_id.is_none());
}

#[tokio::test]
async fn test_short_tail_falls_back_to_last_four() {
    let mut h = harness(vec![("model-a", Some(VALID_SUMMARY))]);
    let (thread_id, mut ids) = thread_with_messages(&h.persist, 6).await;

    let first = h.summarizer.manual_summarize(&thread_id).await.unwrap();
    started_id(&first);
    h.worker.drain().await;

    ids.extend(add_messages(&h.persist, &thread_id, 6, 2).await);

    let second = h.summarizer.manual_summarize(&thread_id).await.unwrap();
    let record = h.persist.get_summary(&started_id(&second)).await.unwrap().unwrap();

    assert_eq!(record.message_range.from_index, 4);
    assert_eq!(record.message_range.to_index, 7);
    assert_eq!(record.message_range.from_message_id, ids[4]);
    assert_eq!(record.message_range.to_message_id, ids[7]);

    h.worker.drain().await;

    // The second prompt carries the first summary as continuity context
    let prompts = h.chat.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(!prompts[0].contains("Budget is 2000 EUR"));
    assert!(prompts[1].contains("Budget is 2000 EUR"));
    assert!(prompts[1].contains("message number 7"));
}

#[tokio::test]
async fn test_exhausted_cascade_fails_record() {
    let mut h = harness(vec![]);
    let (thread_id, _) = thread_with_messages(&h.persist, 5).await;
    let mut events = h.summarizer.subscribe();

    let outcome = h.summarizer.manual_summarize(&thread_id).await.unwrap();
    let summary_id = started_id(&outcome);
    h.worker.drain().await;

    let record = h.persist.get_summary(&summary_id).await.unwrap().unwrap();
    assert_eq!(record.status, SummaryStatus::Failed);
    let error_info = record.error_info.unwrap();
    assert_eq!(error_info.fallback_attempts, 3);
    assert_eq!(error_info.last_attempt_model, "model-c");
    assert!(error_info.message.contains("All 3 candidate models failed"));

    let event = events.recv().await.unwrap();
    assert_eq!(event.summary_id, summary_id);
    assert_eq!(event.status, SummaryStatus::Failed);
    assert!(event.error.is_some());

    // A failed record does not block the next run
    let retry = h.summarizer.manual_summarize(&thread_id).await.unwrap();
    assert!(retry.is_started());
}

#[tokio::test]
async fn test_cascade_falls_through_to_working_model() {
    let mut h = harness(vec![("model-a", None), ("model-b", Some(VALID_SUMMARY))]);
    let (thread_id, _) = thread_with_messages(&h.persist, 4).await;

    let summary_id = started_id(&h.summarizer.manual_summarize(&thread_id).await.unwrap());
    h.worker.drain().await;

    let record = h.persist.get_summary(&summary_id).await.unwrap().unwrap();
    assert_eq!(record.status, SummaryStatus::Completed);
    assert_eq!(record.model_used, "model-b");
    // No pricing configured for model-b
    assert_eq!(record.cost_usd, None);
}

#[tokio::test]
async fn test_malformed_summary_is_a_failure() {
    let mut h = harness(vec![("model-a", Some(r#"{"overview": "", "key_points": []}"#))]);
    let (thread_id, _) = thread_with_messages(&h.persist, 4).await;

    let summary_id = started_id(&h.summarizer.manual_summarize(&thread_id).await.unwrap());
    h.worker.drain().await;

    let record = h.persist.get_summary(&summary_id).await.unwrap().unwrap();
    assert_eq!(record.status, SummaryStatus::Failed);
    let error_info = record.error_info.unwrap();
    assert_eq!(error_info.last_attempt_model, "model-a");
    assert!(error_info.message.contains("overview"));
}

#[tokio::test]
async fn test_second_manual_call_is_refused_while_generating() {
    let h = harness(vec![("model-a", Some(VALID_SUMMARY))]);
    let (thread_id, _) = thread_with_messages(&h.persist, 8).await;

    let first = h.summarizer.manual_summarize(&thread_id).await.unwrap();
    let second = h.summarizer.manual_summarize(&thread_id).await.unwrap();

    assert!(first.is_started());
    assert_eq!(second, SummarizeOutcome::Skipped(SkipReason::AlreadyInProgress));
    assert!(h.summarizer.is_summarization_in_progress(&thread_id).await.unwrap());
    assert_eq!(h.summarizer.get_thread_summaries(&thread_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_too_few_messages_creates_no_record() {
    let h = harness(vec![("model-a", Some(VALID_SUMMARY))]);
    let (thread_id, _) = thread_with_messages(&h.persist, 3).await;

    let outcome = h.summarizer.manual_summarize(&thread_id).await.unwrap();
    assert_eq!(outcome, SummarizeOutcome::Skipped(SkipReason::NotEnoughMessages));
    assert!(h.summarizer.get_thread_summaries(&thread_id).await.unwrap().is_empty());

    let (empty_id, _) = thread_with_messages(&h.persist, 0).await;
    let outcome = h.summarizer.manual_summarize(&empty_id).await.unwrap();
    assert_eq!(outcome, SummarizeOutcome::Skipped(SkipReason::NoMessages));
}

#[tokio::test]
async fn test_unknown_thread_is_an_error() {
    let h = harness(vec![]);
    let err = h.summarizer.manual_summarize("missing").await.unwrap_err();
    assert!(matches!(err, recap_summarize::SummarizeError::ThreadNotFound(_)));
}

#[tokio::test]
async fn test_concurrent_triggers_start_exactly_one_run() {
    let h = harness(vec![("model-a", Some(VALID_SUMMARY))]);
    let (thread_id, _) = thread_with_messages(&h.persist, 12).await;

    let mut handles = Vec::new();
    for _ in 0..16 {
        let summarizer = h.summarizer.clone();
        let thread_id = thread_id.clone();
        handles.push(tokio::spawn(async move {
            summarizer.manual_summarize(&thread_id).await.unwrap()
        }));
    }

    let mut started = 0;
    for handle in handles {
        match handle.await.unwrap() {
            SummarizeOutcome::Started { .. } => started += 1,
            SummarizeOutcome::Skipped(reason) => assert_eq!(reason, SkipReason::AlreadyInProgress),
        }
    }

    assert_eq!(started, 1);
    let generating = h
        .summarizer
        .get_thread_summaries(&thread_id)
        .await
        .unwrap()
        .into_iter()
        .filter(|s| s.status == SummaryStatus::Generating)
        .count();
    assert_eq!(generating, 1);
}

#[tokio::test]
async fn test_token_threshold_auto_triggers() {
    let chat = ScriptedChat::new(vec![("model-a", Some(VALID_SUMMARY))]);
    let mut h = harness_with(chat, config().with_auto_thresholds(1_000, 20));
    let thread = h
        .persist
        .create_thread("user-1", ThreadMetadata::default())
        .await
        .unwrap();

    let mut auto_outcome = None;
    for i in 0..10 {
        let message = Message::text(&thread.id, MessageRole::User, format!("message number {}", i));
        let tokens = estimate_message_tokens(&message);
        h.persist.save_message(message).await.unwrap();

        if let Some(outcome) = h.summarizer.update_thread_counters(&thread.id, 1, tokens).await.unwrap() {
            auto_outcome = Some((i, outcome));
            break;
        }
    }

    // 4 tokens per message: the fifth message crosses 20
    let (index, outcome) = auto_outcome.expect("threshold should have fired");
    assert_eq!(index, 4);
    let record = h.persist.get_summary(&started_id(&outcome)).await.unwrap().unwrap();
    assert_eq!(record.trigger_type, TriggerType::Auto);
    assert_eq!(record.message_range.message_count, 5);

    let thread = h.persist.get_thread(&thread.id).await.unwrap().unwrap();
    assert_eq!(thread.tokens_since_last_summary, 0);
    assert_eq!(thread.messages_since_last_summary, 0);

    h.worker.drain().await;
    let context = h.summarizer.get_latest_summaries_for_context(&thread.id).await.unwrap();
    assert_eq!(context.summaries.len(), 1);
    assert!(!context.has_active_summary);
}

#[tokio::test]
async fn test_below_threshold_does_not_trigger() {
    let h = harness(vec![("model-a", Some(VALID_SUMMARY))]);
    let (thread_id, _) = thread_with_messages(&h.persist, 2).await;

    let outcome = h.summarizer.update_thread_counters(&thread_id, 2, 8).await.unwrap();
    assert!(outcome.is_none());

    let thread = h.persist.get_thread(&thread_id).await.unwrap().unwrap();
    assert_eq!(thread.messages_since_last_summary, 2);
    assert_eq!(thread.tokens_since_last_summary, 8);
}

#[tokio::test]
async fn test_context_returns_latest_two_completed() {
    let mut h = harness(vec![("model-a", Some(VALID_SUMMARY))]);
    let (thread_id, _) = thread_with_messages(&h.persist, 4).await;

    let mut completed = Vec::new();
    for round in 0..3 {
        add_messages(&h.persist, &thread_id, 4 + round * 4, 4).await;
        completed.push(started_id(&h.summarizer.manual_summarize(&thread_id).await.unwrap()));
        h.worker.drain().await;
    }
    let pending = started_id(&h.summarizer.manual_summarize(&thread_id).await.unwrap());

    let context = h.summarizer.get_latest_summaries_for_context(&thread_id).await.unwrap();
    assert!(context.has_active_summary);
    assert_eq!(context.summaries.len(), 2);
    assert_eq!(context.summaries[0].id, completed[2]);
    assert_eq!(context.summaries[1].id, completed[1]);

    let history = h.summarizer.get_thread_summaries(&thread_id).await.unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].id, pending);
}

#[tokio::test]
async fn test_sweep_fails_stale_generating_records() {
    let chat = ScriptedChat::new(vec![("model-a", Some(VALID_SUMMARY))]);
    let mut h = harness_with(
        chat,
        SummarizationConfig {
            stale_after_secs: 0,
            ..config()
        },
    );
    let (thread_id, _) = thread_with_messages(&h.persist, 4).await;
    let mut events = h.summarizer.subscribe();

    let summary_id = started_id(&h.summarizer.manual_summarize(&thread_id).await.unwrap());
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    assert_eq!(h.summarizer.sweep_stale_summaries().await.unwrap(), 1);

    let record = h.persist.get_summary(&summary_id).await.unwrap().unwrap();
    assert_eq!(record.status, SummaryStatus::Failed);
    let error_info = record.error_info.unwrap();
    assert_eq!(error_info.message, "summary generation timed out");
    assert_eq!(error_info.fallback_attempts, 0);
    assert_eq!(error_info.last_attempt_model, "model-a");

    let event = events.recv().await.unwrap();
    assert_eq!(event.summary_id, summary_id);

    // The queued job finds a terminal record and leaves it alone
    assert_eq!(h.worker.drain().await, 1);
    let record = h.persist.get_summary(&summary_id).await.unwrap().unwrap();
    assert_eq!(record.status, SummaryStatus::Failed);
    assert!(!h.summarizer.is_summarization_in_progress(&thread_id).await.unwrap());
}

#[tokio::test]
async fn test_closed_queue_fails_the_claimed_record() {
    let h = harness(vec![("model-a", Some(VALID_SUMMARY))]);
    let (thread_id, _) = thread_with_messages(&h.persist, 4).await;
    drop(h.worker);

    let err = h.summarizer.manual_summarize(&thread_id).await.unwrap_err();
    assert!(matches!(err, recap_summarize::SummarizeError::QueueClosed));

    let history = h.summarizer.get_thread_summaries(&thread_id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, SummaryStatus::Failed);
    assert!(!h.summarizer.is_summarization_in_progress(&thread_id).await.unwrap());
}

//! # Recap
//!
//! Incremental conversation summarization for chat applications whose threads
//! outgrow a model's context window.
//!
//! ## Overview
//!
//! Recap watches each thread's unsummarized tail and compresses it into a
//! structured summary once it grows past a message or token threshold (or on
//! demand). Each run:
//!
//! - computes the exact message range not yet covered by a completed summary
//! - claims the thread so at most one summary is `generating` at a time
//! - asks an ordered list of candidate models for structured output, falling back on failure
//! - records the outcome as an auditable `completed` or `failed` summary record
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use recap::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let chat = OpenAIClient::new(std::env::var("LLM_API_KEY")?)?
//!         .with_base_url(OPENROUTER_API_BASE);
//!     let llm = Arc::new(CascadeClient::new(Arc::new(chat)));
//!     let persist = Arc::new(InMemoryPersistenceClient::new());
//!
//!     let (summarizer, worker) =
//!         Summarizer::new(persist.clone(), llm, SummarizationConfig::default());
//!     worker.spawn();
//!
//!     let thread = persist.create_thread("user-1", ThreadMetadata::default()).await?;
//!     let message = Message::text(&thread.id, MessageRole::User, "Let's plan the launch");
//!     let tokens = estimate_message_tokens(&message);
//!     persist.save_message(message).await?;
//!
//!     // Feeds the automatic trigger; returns Some(outcome) when a run was attempted
//!     summarizer.update_thread_counters(&thread.id, 1, tokens).await?;
//!
//!     // Or trigger explicitly
//!     match summarizer.manual_summarize(&thread.id).await? {
//!         SummarizeOutcome::Started { summary_id } => println!("started {}", summary_id),
//!         SummarizeOutcome::Skipped(reason) => println!("skipped: {}", reason),
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **`recap-llm`**: chat client trait, OpenAI-compatible client, model cascade
//! - **`recap-persist`**: thread, message and summary record storage (in-memory, MongoDB)
//! - **`recap-summarize`**: trigger policy, range calculation, generation and the worker
//!
//! ## Features
//!
//! - `mongodb`: enables [`MongoPersistenceClient`]

pub mod prelude;

pub use recap_llm::{
    ChatClient, StructuredClient, CascadeClient, OpenAIClient,
    ChatRequest, ChatResponse, ChatOptions, StructuredRequest, StructuredResponse,
    ResponseFormat, TokenUsage, Role,
    Message as ChatMessage,
    OPENAI_API_BASE, OPENROUTER_API_BASE,
};

pub use recap_persist::{
    PersistenceClient, InMemoryPersistenceClient, PersistError,
    Message, MessagePart, MessageRole, Thread, ThreadMetadata,
    SummaryRecord, SummaryContent, SummaryStatus, SummaryErrorInfo, MessageRange,
    TriggerType, ToolResultSummary, Importance,
};

#[cfg(feature = "mongodb")]
pub use recap_persist::MongoPersistenceClient;

pub use recap_summarize::{
    Summarizer, SummaryWorker, SummarizationConfig, ModelPricing,
    SummarizeOutcome, SkipReason, ContextSummaries, SummaryEvent, SummarizeError,
    estimate_tokens, estimate_message_tokens,
};

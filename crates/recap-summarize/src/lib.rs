//! Incremental conversation summarization.
//!
//! [`Summarizer`] decides when a thread's unsummarized tail should be compressed,
//! claims the thread so at most one run is in flight, and queues the run for a
//! [`SummaryWorker`], which drives structured generation through the configured
//! candidate models and finalizes the record as `completed` or `failed`.

pub mod config;
pub mod error;
pub mod tokens;
pub mod range;
pub mod policy;
pub mod templates;
pub mod generator;
pub mod worker;
pub mod orchestrator;

pub use config::{ModelPricing, SummarizationConfig};
pub use error::{GenerationError, Result, SummarizeError};
pub use tokens::{estimate_message_tokens, estimate_messages_tokens, estimate_tokens};
pub use range::{compute_range, materialize, ComputedRange};
pub use policy::{SkipReason, TriggerPolicy};
pub use templates::{build_summary_prompt, summary_schema, SUMMARY_SCHEMA_NAME};
pub use generator::{GeneratedSummary, SummaryGenerator};
pub use worker::{SummaryEvent, SummaryJob, SummaryWorker};
pub use orchestrator::{ContextSummaries, SummarizeOutcome, Summarizer};

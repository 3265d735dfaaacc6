//! Prelude module for convenient imports
//!
//! Import everything you need with:
//! ```rust
//! use recap::prelude::*;
//! ```

pub use crate::{
    ChatClient, StructuredClient, CascadeClient, OpenAIClient, OPENROUTER_API_BASE,
    PersistenceClient, InMemoryPersistenceClient,
    Message, MessagePart, MessageRole, Thread, ThreadMetadata,
    SummaryRecord, SummaryStatus,
    Summarizer, SummaryWorker, SummarizationConfig, SummarizeOutcome, SkipReason,
    estimate_message_tokens,
};

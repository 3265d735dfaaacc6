mod message;
mod summary;
mod thread;

// Export database-agnostic models
pub use message::{Message, MessagePart, MessageRole, ToolResultView};
pub use summary::{
    ClaimOutcome, Importance, MessageRange, SummaryCompletion, SummaryContent, SummaryErrorInfo,
    SummaryRecord, SummaryStatus, ToolResultSummary, TriggerType,
};
pub use thread::{Thread, ThreadMetadata};

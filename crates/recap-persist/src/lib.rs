pub mod models;
pub mod error;
pub mod trait_client;
pub mod memory;
pub mod dbs;

pub use models::{
    ClaimOutcome, Importance, Message, MessagePart, MessageRange, MessageRole, SummaryCompletion,
    SummaryContent, SummaryErrorInfo, SummaryRecord, SummaryStatus, Thread, ThreadMetadata,
    ToolResultSummary, ToolResultView, TriggerType,
};
pub use error::{PersistError, Result};
pub use trait_client::PersistenceClient;
pub use memory::InMemoryPersistenceClient;

#[cfg(feature = "mongodb")]
pub use dbs::mongo::MongoPersistenceClient;

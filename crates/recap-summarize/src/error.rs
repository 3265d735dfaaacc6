use recap_persist::{PersistError, SummaryErrorInfo};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SummarizeError {
    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    #[error("Summary job queue is closed")]
    QueueClosed,
}

pub type Result<T> = std::result::Result<T, SummarizeError>;

/// Why a generation attempt produced no usable summary
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct GenerationError {
    pub message: String,
    pub fallback_attempts: usize,
    pub last_attempt_model: String,
}

impl GenerationError {
    pub fn new(
        message: impl Into<String>,
        fallback_attempts: usize,
        last_attempt_model: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            fallback_attempts,
            last_attempt_model: last_attempt_model.into(),
        }
    }
}

impl From<GenerationError> for SummaryErrorInfo {
    fn from(error: GenerationError) -> Self {
        Self {
            message: error.message,
            fallback_attempts: error.fallback_attempts,
            last_attempt_model: error.last_attempt_model,
        }
    }
}

use thiserror::Error;

use crate::models::SummaryStatus;

/// Storage failures surfaced by every [`crate::PersistenceClient`] backend
#[derive(Error, Debug)]
pub enum PersistError {
    #[cfg(feature = "mongodb")]
    #[error("MongoDB error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[cfg(feature = "mongodb")]
    #[error("BSON encoding error: {0}")]
    Bson(#[from] bson::ser::Error),

    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    #[error("Summary not found: {0}")]
    SummaryNotFound(String),

    /// A terminal write hit a record that already left `generating`
    #[error("Summary {summary_id} is {status}, expected generating")]
    InvalidTransition {
        summary_id: String,
        status: SummaryStatus,
    },

    #[error("Storage unavailable: {0}")]
    Connection(String),
}

pub type Result<T> = std::result::Result<T, PersistError>;

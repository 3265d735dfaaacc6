use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use recap_persist::PersistError;
use recap_summarize::SummarizeError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("Summarization error: {0}")]
    Summarize(SummarizeError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<SummarizeError> for ApiError {
    fn from(error: SummarizeError) -> Self {
        match error {
            SummarizeError::ThreadNotFound(id) => ApiError::ThreadNotFound(id),
            SummarizeError::Persist(e) => ApiError::from(e),
            other => ApiError::Summarize(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::ThreadNotFound(_) | ApiError::Persist(PersistError::ThreadNotFound(_)) => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            ApiError::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            ApiError::Persist(ref e) => {
                tracing::error!("Persistence error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
            }
            ApiError::Summarize(ref e) => {
                tracing::error!("Summarization error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Summarization error".to_string())
            }
            ApiError::Config(ref msg) => {
                tracing::error!("Config error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Configuration error".to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

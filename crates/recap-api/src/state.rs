use std::sync::Arc;

use recap_llm::{CascadeClient, OpenAIClient};
use recap_persist::{InMemoryPersistenceClient, PersistenceClient};
use recap_summarize::{Summarizer, SummaryWorker};

use crate::config::{Config, StorageBackend};
use crate::error::{ApiError, ApiResult};

/// Shared application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub persist: Arc<dyn PersistenceClient>,
    pub summarizer: Summarizer,
}

impl AppState {
    pub fn new(
        config: Config,
        persist: Arc<dyn PersistenceClient>,
        summarizer: Summarizer,
    ) -> Self {
        Self {
            config: Arc::new(config),
            persist,
            summarizer,
        }
    }

    /// Wire storage, the model client and the summarizer from configuration
    ///
    /// The returned worker must be spawned for summaries to leave `generating`.
    pub async fn from_config(config: Config) -> ApiResult<(Self, SummaryWorker)> {
        let persist = connect_storage(&config).await?;

        let chat_client = OpenAIClient::new(config.llm_api_key.clone())
            .map_err(|e| ApiError::Config(format!("LLM client: {}", e)))?
            .with_base_url(config.llm.base_url.clone());
        let llm = Arc::new(CascadeClient::new(Arc::new(chat_client)));

        let (summarizer, worker) =
            Summarizer::new(Arc::clone(&persist), llm, config.summarization.clone());

        Ok((Self::new(config, persist, summarizer), worker))
    }
}

async fn connect_storage(config: &Config) -> ApiResult<Arc<dyn PersistenceClient>> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Ok(Arc::new(InMemoryPersistenceClient::new()))
        }
        #[cfg(feature = "mongodb")]
        StorageBackend::Mongodb => {
            tracing::info!(database = %config.storage.database, "Connecting to MongoDB");
            let client = recap_persist::MongoPersistenceClient::connect(
                &config.mongodb_uri,
                &config.storage.database,
            )
            .await?;
            tracing::info!("MongoDB connected");
            Ok(Arc::new(client))
        }
        #[cfg(not(feature = "mongodb"))]
        StorageBackend::Mongodb => Err(ApiError::Config(
            "storage.backend = \"mongodb\" requires the `mongodb` feature".to_string(),
        )),
    }
}

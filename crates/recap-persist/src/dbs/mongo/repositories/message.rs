use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    options::IndexOptions,
    Client, Collection, IndexModel,
};

use crate::dbs::mongo::models::MongoMessage;
use crate::error::Result;

/// Append-only transcript storage, read back in range order
#[derive(Clone)]
pub struct MongoMessageRepository {
    messages: Collection<MongoMessage>,
}

impl MongoMessageRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        Self {
            messages: client.database(db_name).collection("messages"),
        }
    }

    /// Index backing the per-thread transcript scan
    pub async fn ensure_indexes(&self) -> Result<()> {
        let index = IndexModel::builder()
            .keys(transcript_order(doc! { "thread_id": 1 }))
            .options(IndexOptions::builder().name("thread_transcript".to_string()).build())
            .build();
        self.messages.create_index(index).await?;
        Ok(())
    }

    pub async fn append(&self, message: MongoMessage) -> Result<()> {
        self.messages.insert_one(&message).await?;
        Ok(())
    }

    /// Whole transcript; `seq` breaks ties between equal timestamps
    pub async fn transcript(&self, thread_id: &str) -> Result<Vec<MongoMessage>> {
        let cursor = self
            .messages
            .find(doc! { "thread_id": thread_id })
            .sort(transcript_order(Document::new()))
            .await?;
        Ok(cursor.try_collect().await?)
    }
}

/// Append the transcript ordering keys to `prefix`
fn transcript_order(mut prefix: Document) -> Document {
    prefix.insert("updated_at", 1);
    prefix.insert("seq", 1);
    prefix
}

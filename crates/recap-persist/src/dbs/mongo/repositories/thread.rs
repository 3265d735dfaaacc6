use mongodb::{bson::doc, options::ReturnDocument, Client, Collection};

use crate::dbs::mongo::models::MongoThread;
use crate::error::Result;

#[derive(Clone)]
pub struct MongoThreadRepository {
    collection: Collection<MongoThread>,
}

impl MongoThreadRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("threads");
        Self { collection }
    }

    /// Create a new thread
    pub async fn create_thread(&self, thread: MongoThread) -> Result<MongoThread> {
        self.collection.insert_one(&thread).await?;
        Ok(thread)
    }

    /// Get thread by ID
    pub async fn get_thread(&self, thread_id: &str) -> Result<Option<MongoThread>> {
        Ok(self.collection.find_one(doc! { "_id": thread_id }).await?)
    }

    /// Bump since-last-summary counters, returning the updated thread
    pub async fn increment_counters(
        &self,
        thread_id: &str,
        messages: i64,
        tokens: i64,
    ) -> Result<Option<MongoThread>> {
        let update = doc! {
            "$inc": {
                "messages_since_last_summary": messages,
                "tokens_since_last_summary": tokens
            },
            "$set": { "updated_at": bson::DateTime::now() }
        };

        Ok(self
            .collection
            .find_one_and_update(doc! { "_id": thread_id }, update)
            .return_document(ReturnDocument::After)
            .await?)
    }

    /// Compare-and-set on `active_summary_id`
    ///
    /// Succeeds only while the marker equals `expected`; `None` means unset.
    pub async fn claim(
        &self,
        thread_id: &str,
        summary_id: &str,
        expected: Option<&str>,
        claimed_at: bson::DateTime,
    ) -> Result<Option<MongoThread>> {
        let filter = doc! { "_id": thread_id, "active_summary_id": expected };
        let update = doc! {
            "$set": {
                "active_summary_id": summary_id,
                "last_summary_at": claimed_at,
                "last_summary_id": summary_id,
                "messages_since_last_summary": 0_i64,
                "tokens_since_last_summary": 0_i64,
                "updated_at": claimed_at
            }
        };

        Ok(self
            .collection
            .find_one_and_update(filter, update)
            .return_document(ReturnDocument::After)
            .await?)
    }

    /// Clear the in-flight marker if it still points at `summary_id`
    pub async fn release(&self, thread_id: &str, summary_id: &str) -> Result<()> {
        let filter = doc! { "_id": thread_id, "active_summary_id": summary_id };
        let update = doc! {
            "$set": {
                "active_summary_id": null,
                "updated_at": bson::DateTime::now()
            }
        };
        self.collection.update_one(filter, update).await?;
        Ok(())
    }

    pub async fn increment_summary_count(&self, thread_id: &str) -> Result<()> {
        let update = doc! { "$inc": { "summary_count": 1_i64 } };
        self.collection.update_one(doc! { "_id": thread_id }, update).await?;
        Ok(())
    }

    /// Touch the thread and reserve its next message sequence number
    pub async fn next_message_seq(&self, thread_id: &str) -> Result<Option<i64>> {
        let update = doc! {
            "$inc": { "message_seq": 1_i64 },
            "$set": { "updated_at": bson::DateTime::now() }
        };

        let thread = self
            .collection
            .find_one_and_update(doc! { "_id": thread_id }, update)
            .return_document(ReturnDocument::After)
            .await?;
        Ok(thread.map(|thread| thread.message_seq))
    }
}

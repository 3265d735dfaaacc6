use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    options::ReturnDocument,
    Client, Collection,
};

use crate::dbs::mongo::models::MongoSummaryRecord;
use crate::error::Result;

#[derive(Clone)]
pub struct MongoSummaryRepository {
    collection: Collection<MongoSummaryRecord>,
}

impl MongoSummaryRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("summaries");
        Self { collection }
    }

    pub async fn insert(&self, record: &MongoSummaryRecord) -> Result<()> {
        self.collection.insert_one(record).await?;
        Ok(())
    }

    /// Drop a record whose thread claim was lost
    pub async fn delete(&self, summary_id: &str) -> Result<()> {
        self.collection.delete_one(doc! { "_id": summary_id }).await?;
        Ok(())
    }

    pub async fn get(&self, summary_id: &str) -> Result<Option<MongoSummaryRecord>> {
        Ok(self.collection.find_one(doc! { "_id": summary_id }).await?)
    }

    /// Apply `set` only if the record is still `generating`
    pub async fn transition(
        &self,
        summary_id: &str,
        mut set: Document,
    ) -> Result<Option<MongoSummaryRecord>> {
        set.insert("updated_at", bson::DateTime::now());
        let filter = doc! { "_id": summary_id, "status": "generating" };

        Ok(self
            .collection
            .find_one_and_update(filter, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await?)
    }

    /// Newest first, optionally restricted to one status
    pub async fn list_for_thread(
        &self,
        thread_id: &str,
        status: Option<&str>,
        limit: i64,
    ) -> Result<Vec<MongoSummaryRecord>> {
        let mut filter = doc! { "thread_id": thread_id };
        if let Some(status) = status {
            filter.insert("status", status);
        }

        let records = self
            .collection
            .find(filter)
            .sort(doc! { "created_at": -1 })
            .limit(limit)
            .await?
            .try_collect()
            .await?;
        Ok(records)
    }

    pub async fn count_generating(&self, thread_id: &str) -> Result<u64> {
        let filter = doc! { "thread_id": thread_id, "status": "generating" };
        Ok(self.collection.count_documents(filter).await?)
    }

    pub async fn list_generating_before(
        &self,
        before: bson::DateTime,
    ) -> Result<Vec<MongoSummaryRecord>> {
        let filter = doc! { "status": "generating", "created_at": { "$lt": before } };
        let records = self
            .collection
            .find(filter)
            .sort(doc! { "created_at": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(records)
    }
}

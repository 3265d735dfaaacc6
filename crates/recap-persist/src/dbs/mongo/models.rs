use bson::DateTime as BsonDateTime;
use serde::{Deserialize, Serialize};

use crate::models::{
    Message, MessagePart, MessageRange, MessageRole, SummaryContent, SummaryErrorInfo,
    SummaryRecord, SummaryStatus, Thread, ThreadMetadata, TriggerType,
};

/// MongoDB-specific Thread model (native BSON dates so range queries work)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoThread {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
    pub metadata: ThreadMetadata,
    pub last_summary_at: Option<BsonDateTime>,
    pub last_summary_id: Option<String>,
    pub messages_since_last_summary: i64,
    pub tokens_since_last_summary: i64,
    pub summary_count: i64,
    pub active_summary_id: Option<String>,
    /// Last sequence number handed to a message in this thread
    #[serde(default)]
    pub message_seq: i64,
}

/// MongoDB-specific Message model
///
/// BSON dates only keep milliseconds, so `seq` carries insertion order for
/// messages whose timestamps collide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMessage {
    #[serde(rename = "_id")]
    pub id: String,
    pub thread_id: String,
    pub seq: i64,
    pub role: MessageRole,
    pub parts: Vec<MessagePart>,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

/// MongoDB-specific SummaryRecord model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSummaryRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub thread_id: String,
    pub summary: SummaryContent,
    pub message_range: MessageRange,
    pub source_token_count: i64,
    pub summary_token_count: i64,
    pub cost_usd: Option<f64>,
    pub model_used: String,
    pub trigger_type: TriggerType,
    pub status: SummaryStatus,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
    pub error_info: Option<SummaryErrorInfo>,
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

// Conversions between database-agnostic and MongoDB-specific models

impl From<Thread> for MongoThread {
    fn from(thread: Thread) -> Self {
        Self {
            id: thread.id,
            user_id: thread.user_id,
            created_at: BsonDateTime::from_chrono(thread.created_at),
            updated_at: BsonDateTime::from_chrono(thread.updated_at),
            metadata: thread.metadata,
            last_summary_at: thread.last_summary_at.map(BsonDateTime::from_chrono),
            last_summary_id: thread.last_summary_id,
            messages_since_last_summary: to_i64(thread.messages_since_last_summary),
            tokens_since_last_summary: to_i64(thread.tokens_since_last_summary),
            summary_count: to_i64(thread.summary_count),
            active_summary_id: thread.active_summary_id,
            message_seq: 0,
        }
    }
}

impl From<MongoThread> for Thread {
    fn from(thread: MongoThread) -> Self {
        Self {
            id: thread.id,
            user_id: thread.user_id,
            created_at: thread.created_at.to_chrono(),
            updated_at: thread.updated_at.to_chrono(),
            metadata: thread.metadata,
            last_summary_at: thread.last_summary_at.map(|d| d.to_chrono()),
            last_summary_id: thread.last_summary_id,
            messages_since_last_summary: to_u64(thread.messages_since_last_summary),
            tokens_since_last_summary: to_u64(thread.tokens_since_last_summary),
            summary_count: to_u64(thread.summary_count),
            active_summary_id: thread.active_summary_id,
        }
    }
}

impl MongoMessage {
    pub fn new(msg: Message, seq: i64) -> Self {
        Self {
            id: msg.id,
            thread_id: msg.thread_id,
            seq,
            role: msg.role,
            parts: msg.parts,
            created_at: BsonDateTime::from_chrono(msg.created_at),
            updated_at: BsonDateTime::from_chrono(msg.updated_at),
        }
    }
}

impl From<MongoMessage> for Message {
    fn from(msg: MongoMessage) -> Self {
        Self {
            id: msg.id,
            thread_id: msg.thread_id,
            role: msg.role,
            parts: msg.parts,
            created_at: msg.created_at.to_chrono(),
            updated_at: msg.updated_at.to_chrono(),
        }
    }
}

impl From<SummaryRecord> for MongoSummaryRecord {
    fn from(record: SummaryRecord) -> Self {
        Self {
            id: record.id,
            thread_id: record.thread_id,
            summary: record.summary,
            message_range: record.message_range,
            source_token_count: to_i64(record.source_token_count),
            summary_token_count: to_i64(record.summary_token_count),
            cost_usd: record.cost_usd,
            model_used: record.model_used,
            trigger_type: record.trigger_type,
            status: record.status,
            created_at: BsonDateTime::from_chrono(record.created_at),
            updated_at: BsonDateTime::from_chrono(record.updated_at),
            error_info: record.error_info,
        }
    }
}

impl From<MongoSummaryRecord> for SummaryRecord {
    fn from(record: MongoSummaryRecord) -> Self {
        Self {
            id: record.id,
            thread_id: record.thread_id,
            summary: record.summary,
            message_range: record.message_range,
            source_token_count: to_u64(record.source_token_count),
            summary_token_count: to_u64(record.summary_token_count),
            cost_usd: record.cost_usd,
            model_used: record.model_used,
            trigger_type: record.trigger_type,
            status: record.status,
            created_at: record.created_at.to_chrono(),
            updated_at: record.updated_at.to_chrono(),
            error_info: record.error_info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_without_sequence_counter_starts_at_zero() {
        let thread = MongoThread::from(Thread::new("user-1", ThreadMetadata::default()));
        let mut document = bson::to_document(&thread).unwrap();
        document.remove("message_seq");

        let decoded: MongoThread = bson::from_document(document).unwrap();
        assert_eq!(decoded.message_seq, 0);
    }

    #[test]
    fn test_message_keeps_assigned_sequence() {
        let message = Message::text("t1", MessageRole::User, "hello");
        let stored = MongoMessage::new(message.clone(), 7);

        assert_eq!(stored.seq, 7);
        assert_eq!(Message::from(stored).id, message.id);
    }
}

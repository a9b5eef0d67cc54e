
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::prompt::ChatExchange;
use crate::search::KnowledgeCandidate;

/// Source tag for documents added by the user
pub const SOURCE_MANUAL: &str = "manual";
/// Source tag for answers the user rated as helpful
pub const SOURCE_FEEDBACK: &str = "feedback";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct KnowledgeRecord {
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
    pub content: String,
    /// Serialized vector, see `Embedding::to_stored`
    pub embedding: Option<String>,
    pub source: String,
    pub created_date: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewKnowledgeRecord {
    pub owner_id: i64,
    pub title: String,
    pub content: String,
    pub embedding: Option<String>,
    pub source: String,
}

/// The columns ranking needs
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub(crate) struct CandidateRow {
    pub id: i64,
    pub content: String,
    pub embedding: Option<String>,
}

impl From<CandidateRow> for KnowledgeCandidate {
    #[inline]
    fn from(row: CandidateRow) -> Self {
        Self {
            id: row.id,
            content: row.content,
            embedding: row.embedding,
        }
    }
}

impl From<KnowledgeRecord> for KnowledgeCandidate {
    #[inline]
    fn from(record: KnowledgeRecord) -> Self {
        Self {
            id: record.id,
            content: record.content,
            embedding: record.embedding,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ChatRecord {
    pub id: i64,
    pub owner_id: i64,
    pub message: String,
    pub reply: String,
    pub created_date: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChatRecord {
    pub owner_id: i64,
    pub message: String,
    pub reply: String,
}

impl From<ChatRecord> for ChatExchange {
    #[inline]
    fn from(record: ChatRecord) -> Self {
        Self {
            message: record.message,
            reply: record.reply,
        }
    }
}
